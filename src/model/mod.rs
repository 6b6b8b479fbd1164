pub mod entity;
pub mod labels;
pub mod palette;

pub use entity::{Board, Card, Entity, Issue, Label, Milestone, Organization, TrelloList};
