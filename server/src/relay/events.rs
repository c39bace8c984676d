//! GitHub Webhook Payloads
//!
//! Only the fields the relay reads are modelled; everything else in the
//! payload is ignored on parse and preserved when forwarding the raw body.

use serde::Deserialize;

/// A GitHub account (user or bot).
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub login: String,
    pub html_url: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    /// `completed`, `not_planned`, `reopened`, ... Absent on older payloads.
    #[serde(default)]
    pub state_reason: Option<String>,
}

/// `issues` event.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    pub action: String,
    pub issue: Issue,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub merged: bool,
}

/// `pull_request` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: User,
}

/// Review verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Commented,
    ChangesRequested,
    Approved,
    Dismissed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub id: u64,
    pub state: ReviewState,
    pub body: Option<String>,
    pub user: User,
}

/// `pull_request_review` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewEvent {
    pub action: String,
    pub review: Review,
    pub pull_request: PullRequest,
    pub repository: Repository,
    pub sender: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewComment {
    pub id: u64,
    /// Review this comment belongs to. Every comment created through the
    /// review UI has one.
    pub pull_request_review_id: Option<u64>,
}

/// `pull_request_review_comment` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewCommentEvent {
    pub action: String,
    pub comment: ReviewComment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub name: Option<String>,
    pub tag_name: String,
    pub html_url: String,
    pub published_at: Option<String>,
    pub body: Option<String>,
    pub author: User,
}

/// `release` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseEvent {
    pub action: String,
    pub release: Release,
    pub repository: Repository,
}
