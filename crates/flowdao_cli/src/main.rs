//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `flowdao_core` linkage.
//! - Run one save/query/count/delete pass against an in-memory database.

use flowdao_core::{
    BaseDao, Column, DaoResult, Database, DatabaseDefinition, Migration, Model, Order, SqliteDao,
};
use rusqlite::types::Value;
use rusqlite::Row;
use std::error::Error;
use uuid::Uuid;

const BOOKMARKS_DB: DatabaseDefinition = DatabaseDefinition::new(
    "bookmarks",
    &[Migration::new(
        1,
        "CREATE TABLE bookmarks (
            id TEXT PRIMARY KEY NOT NULL,
            url TEXT NOT NULL,
            visits INTEGER NOT NULL DEFAULT 0
        );",
    )],
);

#[derive(Debug, Clone)]
struct Bookmark {
    id: String,
    url: String,
    visits: i64,
}

impl Bookmark {
    fn new(url: &str, visits: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            url: url.to_string(),
            visits,
        }
    }
}

impl Model for Bookmark {
    const TABLE: &'static str = "bookmarks";
    const COLUMNS: &'static [&'static str] = &["id", "url", "visits"];
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            url: row.get("url")?,
            visits: row.get("visits")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.id.clone()),
            Value::from(self.url.clone()),
            Value::from(self.visits),
        ]
    }
}

fn most_visited(dao: &SqliteDao<'_, Bookmark>, limit: u32) -> DaoResult<Vec<Bookmark>> {
    let select = dao
        .base_select()
        .order_by("visits", Order::Descending)
        .limit(limit);
    dao.execute_transaction(|conn| select.query_list(conn))
}

fn main() -> Result<(), Box<dyn Error>> {
    println!("flowdao_core ping={}", flowdao_core::ping());
    println!("flowdao_core version={}", flowdao_core::core_version());

    let db = Database::open_in_memory(&BOOKMARKS_DB)?;
    let dao = SqliteDao::<Bookmark>::try_new(&db)?;

    let docs = Bookmark::new("https://doc.rust-lang.org", 12);
    let crates = Bookmark::new("https://crates.io", 30);
    let blog = Bookmark::new("https://blog.rust-lang.org", 3);
    let saved = dao.save_entities(Some(&[docs.clone(), crates, blog]))?;
    println!("saved={saved} count={}", dao.count()?);

    for bookmark in most_visited(&dao, 2)? {
        println!("top url={} visits={}", bookmark.url, bookmark.visits);
    }

    let rarely = dao.query_count(&[Column::new("visits").lt(10)])?;
    println!("rarely_visited={rarely}");

    dao.delete_entity(Some(&docs))?;
    println!("after_delete count={}", dao.count()?);

    dao.delete_all()?;
    println!("after_delete_all count={}", dao.count()?);
    Ok(())
}
