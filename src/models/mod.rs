//! Data models: Jira wire types, browser-facing views, and document helpers.

pub mod adf;
pub mod issue;

pub use issue::{CreatedIssue, JiraIssue, Project, Transition};
