//! # Members
//!
//! The roster records the engine renders, plus the mapping from the GitHub
//! organization-members API shape.
//!
//! ## Key Types
//! - `Member`: one roster entry. `username` is the reconciliation key.
//! - `MemberResponse`: a record from `GET /orgs/{org}/members`.
//! - `MemberField`: selects the field `search_members` filters on.

use crate::errors::MemberError;
use serde::{Deserialize, Serialize};

const ORG_API: &str = "https://api.github.com/orgs";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Opaque identifier. Not used for reconciliation.
    pub id: String,
    /// Globally unique; cards are matched to members by this field.
    pub username: String,
    pub name: String,
    /// Avatar image URL or path.
    pub avatar: String,
    /// Navigation target when the card is clicked.
    pub url: String,
}

impl Member {
    pub fn new(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: username.clone(),
            avatar: String::new(),
            url: format!("https://github.com/{username}"),
            username,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = avatar.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn field(&self, field: MemberField) -> &str {
        match field {
            MemberField::Id => &self.id,
            MemberField::Username => &self.username,
            MemberField::Name => &self.name,
            MemberField::Avatar => &self.avatar,
            MemberField::Url => &self.url,
        }
    }
}

/// One record of the GitHub org members listing.
#[derive(Clone, Debug, Deserialize)]
pub struct MemberResponse {
    pub login: String,
    pub id: u64,
    pub node_id: String,
    pub avatar_url: String,
    #[serde(default)]
    pub gravatar_id: String,
    pub url: String,
    pub html_url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub site_admin: bool,
}

impl From<MemberResponse> for Member {
    fn from(response: MemberResponse) -> Self {
        // The listing carries no display name, so the login doubles as one.
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            username: response.login.clone(),
            name: response.login,
            avatar: response.avatar_url,
            url: response.html_url,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberField {
    Id,
    Username,
    Name,
    Avatar,
    Url,
}

impl std::str::FromStr for MemberField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(MemberField::Id),
            "username" => Ok(MemberField::Username),
            "name" => Ok(MemberField::Name),
            "avatar" => Ok(MemberField::Avatar),
            "url" => Ok(MemberField::Url),
            other => Err(format!("unknown member field: {other}")),
        }
    }
}

/// URL of one page of an organization's public members.
pub fn members_url(org: &str, page: u32) -> String {
    format!("{ORG_API}/{org}/members?page={page}")
}

/// Members whose `field` contains `search` (case-sensitive substring).
pub fn search_members(members: &[Member], field: MemberField, search: &str) -> Vec<Member> {
    members
        .iter()
        .filter(|member| member.field(field).contains(search))
        .cloned()
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MemberListing {
    Members(Vec<Member>),
    GitHub(Vec<MemberResponse>),
}

/// Parses either a list of `Member` records or a raw GitHub members listing.
pub fn parse_member_list(json: &str) -> Result<Vec<Member>, MemberError> {
    let members = match serde_json::from_str::<MemberListing>(json)? {
        MemberListing::Members(members) => members,
        MemberListing::GitHub(responses) => responses.into_iter().map(Member::from).collect(),
    };

    if let Some(index) = members.iter().position(|m| m.username.is_empty()) {
        return Err(MemberError::EmptyUsername(index));
    }

    Ok(members)
}
