//! Diesel ORM models for the `activities` table.

use diesel::prelude::*;

use crate::schema;

/// Activity record from the database.
#[derive(Queryable, QueryableByName, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::activities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ActivityRecord {
    pub id: i32,
    pub source: String,
    pub stable_id: String,
    pub title: String,
    pub content: String,
    pub publish_date: String,
    pub event_date: Option<String>,
    pub url: Option<String>,
    pub tags: String,
    pub raw_payload: String,
    pub created_at: String,
    pub updated_at: String,
}

/// New activity for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::activities)]
pub struct NewActivity<'a> {
    pub source: &'a str,
    pub stable_id: &'a str,
    pub title: &'a str,
    pub content: &'a str,
    pub publish_date: &'a str,
    pub event_date: Option<&'a str>,
    pub url: Option<&'a str>,
    pub tags: &'a str,
    pub raw_payload: &'a str,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}
