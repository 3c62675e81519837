// ABOUTME: SeaORM entities module for the blog's database models and relationships
// ABOUTME: Exports entity definitions for users, posts, comments, and likes

pub mod blog_post;
pub mod comment;
pub mod like;
pub mod user;
