use serde::{Deserialize, Serialize};

/// Session claims carried in the auth cookie. `sub` is the external
/// provider account id; everything pseudonymous is resolved per request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub iss: String,
    pub aud: String,
}

#[cfg(test)]
pub fn test_claims(sub: &str) -> Claims {
    Claims {
        sub: sub.to_string(),
        email: Some(format!("{sub}@example.com")),
        name: None,
        picture: None,
        exp: 0,
        iss: "test-issuer".into(),
        aud: "test-audience".into(),
    }
}
