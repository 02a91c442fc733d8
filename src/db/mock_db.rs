//! In-memory implementation of every repository trait, used by handler
//! tests in place of Postgres. Behaves like the real store where the
//! contracts care: conflict-ignoring inserts, case-insensitive team names,
//! like rows as a set, scoped aggregates.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::checkin_repository::{CheckinRepository, NewCheckin};
use crate::db::directory_repository::DirectoryRepository;
use crate::db::identity_repository::{
    ClaimUsernameOutcome, IdentityRepository, InsertUserOutcome, NewUser,
};
use crate::db::preference_repository::PreferenceRepository;
use crate::db::whisper_repository::{
    LikeState, NewWhisper, WallScope, WhisperRepository, WhisperUpdate,
};
use crate::models::checkin::{
    Checkin, CheckinCommentView, CheckinHistoryItem, CheckinStats, TeamCheckinStats,
};
use crate::models::directory::{Organization, Team};
use crate::models::selection::UserSelection;
use crate::models::user::{User, UserRole};
use crate::models::whisper::{
    CategoryCounts, Participant, WallStats, Whisper, WhisperCategory, WhisperCommentView,
    WhisperView,
};

pub struct StoredWhisperComment {
    pub id: Uuid,
    pub whisper_id: Uuid,
    pub provider_account_id: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}

pub struct StoredCheckinComment {
    pub id: Uuid,
    pub checkin_id: Uuid,
    pub provider_account_id: String,
    pub content: String,
    pub created_at: OffsetDateTime,
}

#[derive(Default)]
pub struct MockDb {
    pub should_fail: bool,
    pub users: Mutex<HashMap<String, User>>,
    pub organizations: Mutex<Vec<Organization>>,
    pub teams: Mutex<Vec<Team>>,
    pub checkins: Mutex<Vec<Checkin>>,
    pub checkin_comments: Mutex<Vec<StoredCheckinComment>>,
    pub whispers: Mutex<Vec<Whisper>>,
    pub whisper_likes: Mutex<HashSet<(Uuid, String)>>,
    pub whisper_comments: Mutex<Vec<StoredWhisperComment>>,
    pub selections: Mutex<HashMap<String, UserSelection>>,
}

impl MockDb {
    fn fail_check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }

    fn username_of(&self, provider_account_id: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap()
            .get(provider_account_id)
            .and_then(|user| user.anonymous_username.clone())
    }

    fn in_scope(&self, whisper: &Whisper, scope: &WallScope) -> bool {
        whisper.organization_id == scope.organization_id
            && scope
                .team_id
                .map_or(true, |team| whisper.team_id == Some(team))
    }

    pub fn seed_user(&self, provider_account_id: &str, username: &str) -> User {
        let now = OffsetDateTime::now_utc();
        let user = User {
            provider_account_id: provider_account_id.to_string(),
            email: Some(format!("{provider_account_id}@example.com")),
            name: None,
            image: None,
            anonymous_id: Uuid::new_v4(),
            anonymous_username: Some(username.to_string()),
            role: UserRole::Member,
            blocked: false,
            created_at: now,
            updated_at: now,
        };
        self.users
            .lock()
            .unwrap()
            .insert(provider_account_id.to_string(), user.clone());
        user
    }

    pub fn seed_organization(&self, name: &str) -> Organization {
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.organizations.lock().unwrap().push(org.clone());
        org
    }

    pub fn seed_team(&self, organization_id: Uuid, name: &str) -> Team {
        let team = Team {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            created_by: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.teams.lock().unwrap().push(team.clone());
        team
    }

    fn whisper_view(&self, whisper: &Whisper, viewer: &str) -> WhisperView {
        let likes = self
            .whisper_likes
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == whisper.id)
            .count() as i64;
        let liked_by_me = self
            .whisper_likes
            .lock()
            .unwrap()
            .contains(&(whisper.id, viewer.to_string()));

        WhisperView {
            id: whisper.id,
            organization_id: whisper.organization_id,
            team_id: whisper.team_id,
            category: whisper.category,
            content: whisper.content.clone(),
            shares: whisper.shares,
            anonymous_username: self.username_of(&whisper.provider_account_id),
            likes,
            liked_by_me,
            mine: whisper.provider_account_id == viewer,
            created_at: whisper.created_at,
            updated_at: whisper.updated_at,
        }
    }
}

#[async_trait]
impl IdentityRepository for MockDb {
    async fn find_user(&self, provider_account_id: &str) -> Result<Option<User>, sqlx::Error> {
        self.fail_check()?;
        Ok(self.users.lock().unwrap().get(provider_account_id).cloned())
    }

    async fn insert_user(&self, new: NewUser<'_>) -> Result<InsertUserOutcome, sqlx::Error> {
        self.fail_check()?;
        let mut users = self.users.lock().unwrap();

        if users.contains_key(new.provider_account_id) {
            return Ok(InsertUserOutcome::AccountExists);
        }
        if users
            .values()
            .any(|user| user.anonymous_username.as_deref() == Some(new.anonymous_username))
        {
            return Ok(InsertUserOutcome::UsernameTaken);
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            provider_account_id: new.provider_account_id.to_string(),
            email: new.email.map(str::to_string),
            name: new.name.map(str::to_string),
            image: new.image.map(str::to_string),
            anonymous_id: new.anonymous_id,
            anonymous_username: Some(new.anonymous_username.to_string()),
            role: new.role,
            blocked: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(new.provider_account_id.to_string(), user.clone());
        Ok(InsertUserOutcome::Created(user))
    }

    async fn refresh_profile(
        &self,
        provider_account_id: &str,
        email: Option<&str>,
        name: Option<&str>,
        image: Option<&str>,
        role: UserRole,
    ) -> Result<Option<User>, sqlx::Error> {
        self.fail_check()?;
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(provider_account_id) else {
            return Ok(None);
        };
        user.email = email.map(str::to_string);
        user.name = name.map(str::to_string);
        user.image = image.map(str::to_string);
        user.role = role;
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn claim_username(
        &self,
        provider_account_id: &str,
        candidate: &str,
    ) -> Result<ClaimUsernameOutcome, sqlx::Error> {
        self.fail_check()?;
        let mut users = self.users.lock().unwrap();

        let taken = users
            .values()
            .any(|user| user.anonymous_username.as_deref() == Some(candidate));

        let Some(user) = users.get_mut(provider_account_id) else {
            return Ok(ClaimUsernameOutcome::AlreadySettled);
        };
        if user.anonymous_username.is_some() {
            return Ok(ClaimUsernameOutcome::AlreadySettled);
        }
        if taken {
            return Ok(ClaimUsernameOutcome::UsernameTaken);
        }
        user.anonymous_username = Some(candidate.to_string());
        user.updated_at = OffsetDateTime::now_utc();
        Ok(ClaimUsernameOutcome::Claimed(user.clone()))
    }

    async fn duplicated_usernames(&self) -> Result<Vec<String>, sqlx::Error> {
        self.fail_check()?;
        let users = self.users.lock().unwrap();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for user in users.values() {
            if let Some(username) = user.anonymous_username.as_deref() {
                *counts.entry(username).or_default() += 1;
            }
        }
        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(username, _)| username.to_string())
            .collect())
    }

    async fn clear_duplicate_username(&self, username: &str) -> Result<Vec<String>, sqlx::Error> {
        self.fail_check()?;
        let mut users = self.users.lock().unwrap();

        let mut holders: Vec<(OffsetDateTime, String)> = users
            .values()
            .filter(|user| user.anonymous_username.as_deref() == Some(username))
            .map(|user| (user.created_at, user.provider_account_id.clone()))
            .collect();
        holders.sort();

        let cleared: Vec<String> = holders.into_iter().skip(1).map(|(_, id)| id).collect();
        for account in &cleared {
            if let Some(user) = users.get_mut(account) {
                user.anonymous_username = None;
            }
        }
        Ok(cleared)
    }
}

#[async_trait]
impl DirectoryRepository for MockDb {
    async fn list_organizations(&self) -> Result<Vec<Organization>, sqlx::Error> {
        self.fail_check()?;
        let mut orgs = self.organizations.lock().unwrap().clone();
        orgs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(orgs)
    }

    async fn find_organization(&self, id: Uuid) -> Result<Option<Organization>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .organizations
            .lock()
            .unwrap()
            .iter()
            .find(|org| org.id == id)
            .cloned())
    }

    async fn find_organization_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Organization>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .organizations
            .lock()
            .unwrap()
            .iter()
            .find(|org| org.name == name)
            .cloned())
    }

    async fn ensure_organization(&self, name: &str) -> Result<Organization, sqlx::Error> {
        self.fail_check()?;
        let mut orgs = self.organizations.lock().unwrap();
        if let Some(org) = orgs.iter().find(|org| org.name == name) {
            return Ok(org.clone());
        }
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        orgs.push(org.clone());
        Ok(org)
    }

    async fn list_teams(&self, organization_id: Uuid) -> Result<Vec<Team>, sqlx::Error> {
        self.fail_check()?;
        let mut teams: Vec<Team> = self
            .teams
            .lock()
            .unwrap()
            .iter()
            .filter(|team| team.organization_id == organization_id)
            .cloned()
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .teams
            .lock()
            .unwrap()
            .iter()
            .find(|team| team.id == id)
            .cloned())
    }

    async fn find_team_by_name(
        &self,
        organization_id: Uuid,
        name: &str,
    ) -> Result<Option<Team>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .teams
            .lock()
            .unwrap()
            .iter()
            .find(|team| {
                team.organization_id == organization_id
                    && team.name.eq_ignore_ascii_case(name)
            })
            .cloned())
    }

    async fn insert_team(
        &self,
        organization_id: Uuid,
        name: &str,
        created_by: Option<&str>,
    ) -> Result<Option<Team>, sqlx::Error> {
        self.fail_check()?;
        let mut teams = self.teams.lock().unwrap();
        if teams.iter().any(|team| {
            team.organization_id == organization_id && team.name.eq_ignore_ascii_case(name)
        }) {
            return Ok(None);
        }
        let team = Team {
            id: Uuid::new_v4(),
            organization_id,
            name: name.to_string(),
            created_by: created_by.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        teams.push(team.clone());
        Ok(Some(team))
    }
}

#[async_trait]
impl CheckinRepository for MockDb {
    async fn insert_checkin(&self, new: NewCheckin<'_>) -> Result<Checkin, sqlx::Error> {
        self.fail_check()?;
        let checkin = Checkin {
            id: Uuid::new_v4(),
            provider_account_id: new.provider_account_id.to_string(),
            team_id: new.team_id,
            mood: new.mood,
            note: new.note.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        self.checkins.lock().unwrap().push(checkin.clone());
        Ok(checkin)
    }

    async fn list_user_checkins(
        &self,
        provider_account_id: &str,
        limit: i64,
    ) -> Result<Vec<CheckinHistoryItem>, sqlx::Error> {
        self.fail_check()?;
        let teams = self.teams.lock().unwrap();
        let mut items: Vec<CheckinHistoryItem> = self
            .checkins
            .lock()
            .unwrap()
            .iter()
            .filter(|checkin| checkin.provider_account_id == provider_account_id)
            .map(|checkin| CheckinHistoryItem {
                id: checkin.id,
                mood: checkin.mood,
                note: checkin.note.clone(),
                team_name: checkin.team_id.and_then(|team_id| {
                    teams.iter().find(|t| t.id == team_id).map(|t| t.name.clone())
                }),
                created_at: checkin.created_at,
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn user_stats(&self, provider_account_id: &str) -> Result<CheckinStats, sqlx::Error> {
        self.fail_check()?;
        let checkins = self.checkins.lock().unwrap();
        let mine: Vec<&Checkin> = checkins
            .iter()
            .filter(|checkin| checkin.provider_account_id == provider_account_id)
            .collect();
        if mine.is_empty() {
            return Ok(CheckinStats::empty());
        }
        let total = mine.len() as i64;
        let sum: i64 = mine.iter().map(|checkin| checkin.mood as i64).sum();
        Ok(CheckinStats {
            average_mood: sum as f64 / total as f64,
            total_checkins: total,
            last_checkin_at: mine.iter().map(|checkin| checkin.created_at).max(),
        })
    }

    async fn list_team_feed(
        &self,
        team_id: Uuid,
        provider_account_id: &str,
        limit: i64,
    ) -> Result<Vec<CheckinHistoryItem>, sqlx::Error> {
        self.fail_check()?;
        let team_name = self
            .teams
            .lock()
            .unwrap()
            .iter()
            .find(|team| team.id == team_id)
            .map(|team| team.name.clone());
        let mut items: Vec<CheckinHistoryItem> = self
            .checkins
            .lock()
            .unwrap()
            .iter()
            .filter(|checkin| {
                checkin.team_id == Some(team_id)
                    && checkin.provider_account_id == provider_account_id
            })
            .map(|checkin| CheckinHistoryItem {
                id: checkin.id,
                mood: checkin.mood,
                note: checkin.note.clone(),
                team_name: team_name.clone(),
                created_at: checkin.created_at,
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn team_stats(&self, team_id: Uuid) -> Result<TeamCheckinStats, sqlx::Error> {
        self.fail_check()?;
        let checkins = self.checkins.lock().unwrap();
        let team: Vec<&Checkin> = checkins
            .iter()
            .filter(|checkin| checkin.team_id == Some(team_id))
            .collect();
        if team.is_empty() {
            return Ok(TeamCheckinStats {
                average_mood: 0.0,
                total_checkins: 0,
                participant_count: 0,
                last_checkin_at: None,
            });
        }
        let total = team.len() as i64;
        let sum: i64 = team.iter().map(|checkin| checkin.mood as i64).sum();
        let participants: HashSet<&str> = team
            .iter()
            .map(|checkin| checkin.provider_account_id.as_str())
            .collect();
        Ok(TeamCheckinStats {
            average_mood: sum as f64 / total as f64,
            total_checkins: total,
            participant_count: participants.len() as i64,
            last_checkin_at: team.iter().map(|checkin| checkin.created_at).max(),
        })
    }

    async fn checkin_exists(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .checkins
            .lock()
            .unwrap()
            .iter()
            .any(|checkin| checkin.id == id))
    }

    async fn insert_comment(
        &self,
        checkin_id: Uuid,
        provider_account_id: &str,
        content: &str,
    ) -> Result<CheckinCommentView, sqlx::Error> {
        self.fail_check()?;
        let comment = StoredCheckinComment {
            id: Uuid::new_v4(),
            checkin_id,
            provider_account_id: provider_account_id.to_string(),
            content: content.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        let view = CheckinCommentView {
            id: comment.id,
            checkin_id,
            content: comment.content.clone(),
            anonymous_username: self.username_of(provider_account_id),
            created_at: comment.created_at,
        };
        self.checkin_comments.lock().unwrap().push(comment);
        Ok(view)
    }

    async fn list_comments(
        &self,
        checkin_id: Uuid,
    ) -> Result<Vec<CheckinCommentView>, sqlx::Error> {
        self.fail_check()?;
        let comments = self.checkin_comments.lock().unwrap();
        let mut views: Vec<CheckinCommentView> = comments
            .iter()
            .filter(|comment| comment.checkin_id == checkin_id)
            .map(|comment| CheckinCommentView {
                id: comment.id,
                checkin_id: comment.checkin_id,
                content: comment.content.clone(),
                anonymous_username: self.username_of(&comment.provider_account_id),
                created_at: comment.created_at,
            })
            .collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }
}

#[async_trait]
impl WhisperRepository for MockDb {
    async fn insert_whisper(&self, new: NewWhisper<'_>) -> Result<Whisper, sqlx::Error> {
        self.fail_check()?;
        let now = OffsetDateTime::now_utc();
        let whisper = Whisper {
            id: Uuid::new_v4(),
            provider_account_id: new.provider_account_id.to_string(),
            organization_id: new.organization_id,
            team_id: new.team_id,
            category: new.category,
            content: new.content.to_string(),
            shares: 0,
            created_at: now,
            updated_at: now,
        };
        self.whispers.lock().unwrap().push(whisper.clone());
        Ok(whisper)
    }

    async fn find_whisper(&self, id: Uuid) -> Result<Option<Whisper>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .whispers
            .lock()
            .unwrap()
            .iter()
            .find(|whisper| whisper.id == id)
            .cloned())
    }

    async fn view_whisper(
        &self,
        id: Uuid,
        viewer: &str,
    ) -> Result<Option<WhisperView>, sqlx::Error> {
        let whisper = self.find_whisper(id).await?;
        Ok(whisper.map(|whisper| self.whisper_view(&whisper, viewer)))
    }

    async fn update_whisper(
        &self,
        id: Uuid,
        owner: &str,
        update: WhisperUpdate<'_>,
    ) -> Result<Option<Whisper>, sqlx::Error> {
        self.fail_check()?;
        let mut whispers = self.whispers.lock().unwrap();
        let Some(whisper) = whispers
            .iter_mut()
            .find(|whisper| whisper.id == id && whisper.provider_account_id == owner)
        else {
            return Ok(None);
        };
        if let Some(content) = update.content {
            whisper.content = content.to_string();
        }
        if let Some(category) = update.category {
            whisper.category = category;
        }
        whisper.updated_at = OffsetDateTime::now_utc();
        Ok(Some(whisper.clone()))
    }

    async fn delete_whisper(&self, id: Uuid, owner: &str) -> Result<bool, sqlx::Error> {
        self.fail_check()?;
        let mut whispers = self.whispers.lock().unwrap();
        let owned = whispers
            .iter()
            .any(|whisper| whisper.id == id && whisper.provider_account_id == owner);
        if !owned {
            return Ok(false);
        }
        self.whisper_comments
            .lock()
            .unwrap()
            .retain(|comment| comment.whisper_id != id);
        self.whisper_likes
            .lock()
            .unwrap()
            .retain(|(whisper_id, _)| *whisper_id != id);
        whispers.retain(|whisper| whisper.id != id);
        Ok(true)
    }

    async fn toggle_like(
        &self,
        id: Uuid,
        provider_account_id: &str,
    ) -> Result<Option<LikeState>, sqlx::Error> {
        self.fail_check()?;
        if !self.whispers.lock().unwrap().iter().any(|w| w.id == id) {
            return Ok(None);
        }
        let mut likes = self.whisper_likes.lock().unwrap();
        let key = (id, provider_account_id.to_string());
        let liked = if likes.contains(&key) {
            likes.remove(&key);
            false
        } else {
            likes.insert(key);
            true
        };
        let count = likes.iter().filter(|(whisper_id, _)| *whisper_id == id).count() as i64;
        Ok(Some(LikeState { liked, likes: count }))
    }

    async fn insert_comment(
        &self,
        whisper_id: Uuid,
        provider_account_id: &str,
        content: &str,
    ) -> Result<Option<WhisperCommentView>, sqlx::Error> {
        self.fail_check()?;
        if !self
            .whispers
            .lock()
            .unwrap()
            .iter()
            .any(|whisper| whisper.id == whisper_id)
        {
            return Ok(None);
        }
        let comment = StoredWhisperComment {
            id: Uuid::new_v4(),
            whisper_id,
            provider_account_id: provider_account_id.to_string(),
            content: content.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        let view = WhisperCommentView {
            id: comment.id,
            whisper_id,
            content: comment.content.clone(),
            anonymous_username: self.username_of(provider_account_id),
            created_at: comment.created_at,
        };
        self.whisper_comments.lock().unwrap().push(comment);
        Ok(Some(view))
    }

    async fn increment_share(&self, whisper_id: Uuid) -> Result<Option<i32>, sqlx::Error> {
        self.fail_check()?;
        let mut whispers = self.whispers.lock().unwrap();
        let Some(whisper) = whispers.iter_mut().find(|whisper| whisper.id == whisper_id)
        else {
            return Ok(None);
        };
        whisper.shares += 1;
        whisper.updated_at = OffsetDateTime::now_utc();
        Ok(Some(whisper.shares))
    }

    async fn wall_posts(
        &self,
        scope: WallScope,
        categories: &[WhisperCategory],
        viewer: &str,
        limit: i64,
    ) -> Result<Vec<WhisperView>, sqlx::Error> {
        self.fail_check()?;
        let whispers = self.whispers.lock().unwrap().clone();
        let mut selected: Vec<&Whisper> = whispers
            .iter()
            .filter(|whisper| self.in_scope(whisper, &scope))
            .filter(|whisper| categories.is_empty() || categories.contains(&whisper.category))
            .collect();
        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected.truncate(limit as usize);
        Ok(selected
            .into_iter()
            .map(|whisper| self.whisper_view(whisper, viewer))
            .collect())
    }

    async fn comments_for_whispers(
        &self,
        whisper_ids: &[Uuid],
    ) -> Result<Vec<WhisperCommentView>, sqlx::Error> {
        self.fail_check()?;
        let comments = self.whisper_comments.lock().unwrap();
        let mut views: Vec<WhisperCommentView> = comments
            .iter()
            .filter(|comment| whisper_ids.contains(&comment.whisper_id))
            .map(|comment| WhisperCommentView {
                id: comment.id,
                whisper_id: comment.whisper_id,
                content: comment.content.clone(),
                anonymous_username: self.username_of(&comment.provider_account_id),
                created_at: comment.created_at,
            })
            .collect();
        views.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(views)
    }

    async fn wall_stats(&self, scope: WallScope) -> Result<WallStats, sqlx::Error> {
        self.fail_check()?;
        let whispers = self.whispers.lock().unwrap();
        let scoped: Vec<&Whisper> = whispers
            .iter()
            .filter(|whisper| self.in_scope(whisper, &scope))
            .collect();
        let scoped_ids: HashSet<Uuid> = scoped.iter().map(|whisper| whisper.id).collect();

        let mut category_counts = CategoryCounts::default();
        for whisper in &scoped {
            category_counts.add(whisper.category, 1);
        }

        let total_likes = self
            .whisper_likes
            .lock()
            .unwrap()
            .iter()
            .filter(|(whisper_id, _)| scoped_ids.contains(whisper_id))
            .count() as i64;
        let total_comments = self
            .whisper_comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| scoped_ids.contains(&comment.whisper_id))
            .count() as i64;

        Ok(WallStats {
            total_posts: scoped.len() as i64,
            total_likes,
            total_comments,
            total_shares: scoped.iter().map(|whisper| whisper.shares as i64).sum(),
            category_counts,
        })
    }

    async fn recent_participants(
        &self,
        scope: WallScope,
        cap: i64,
    ) -> Result<Vec<Participant>, sqlx::Error> {
        self.fail_check()?;
        let whispers = self.whispers.lock().unwrap();
        let scoped_ids: HashSet<Uuid> = whispers
            .iter()
            .filter(|whisper| self.in_scope(whisper, &scope))
            .map(|whisper| whisper.id)
            .collect();

        let mut last_active: HashMap<String, OffsetDateTime> = HashMap::new();
        for whisper in whispers.iter().filter(|w| scoped_ids.contains(&w.id)) {
            let entry = last_active
                .entry(whisper.provider_account_id.clone())
                .or_insert(whisper.created_at);
            if whisper.created_at > *entry {
                *entry = whisper.created_at;
            }
        }
        for comment in self
            .whisper_comments
            .lock()
            .unwrap()
            .iter()
            .filter(|comment| scoped_ids.contains(&comment.whisper_id))
        {
            let entry = last_active
                .entry(comment.provider_account_id.clone())
                .or_insert(comment.created_at);
            if comment.created_at > *entry {
                *entry = comment.created_at;
            }
        }

        let mut participants: Vec<Participant> = last_active
            .into_iter()
            .map(|(account, last_active_at)| Participant {
                anonymous_username: self.username_of(&account),
                last_active_at,
            })
            .collect();
        participants.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        participants.truncate(cap as usize);
        Ok(participants)
    }
}

#[async_trait]
impl PreferenceRepository for MockDb {
    async fn get_selection(
        &self,
        provider_account_id: &str,
    ) -> Result<Option<UserSelection>, sqlx::Error> {
        self.fail_check()?;
        Ok(self
            .selections
            .lock()
            .unwrap()
            .get(provider_account_id)
            .copied())
    }

    async fn upsert_selection(
        &self,
        provider_account_id: &str,
        organization_id: Option<Uuid>,
        team_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        self.fail_check()?;
        self.selections.lock().unwrap().insert(
            provider_account_id.to_string(),
            UserSelection {
                organization_id,
                team_id,
            },
        );
        Ok(())
    }
}
