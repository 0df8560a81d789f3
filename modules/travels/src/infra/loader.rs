//! Bulk dataset ingestion. Runs once, before serving begins, and hands the
//! request layer a store with every back-reference already linked and every
//! age already computed.
//!
//! Dataset layout: `options.txt` (reference timestamp, then a test/rating
//! flag) plus `users_*.json`, `locations_*.json`, `visits_*.json`, each a
//! JSON object with a single array under the matching key. Files load in
//! users → locations → visits order so visits can link to owners that are
//! already in place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::info;

use crate::contract::model::{Gender, LocationRecord, UserRecord, VisitRecord};
use crate::domain::store::Store;

// Row shapes of the dataset files. The REST layer has its own wire DTOs;
// the loader maps through the contract records like any other edge.

#[derive(Debug, Clone, Copy, Deserialize)]
enum GenderRow {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl From<GenderRow> for Gender {
    fn from(g: GenderRow) -> Self {
        match g {
            GenderRow::Male => Gender::Male,
            GenderRow::Female => Gender::Female,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: u32,
    email: String,
    first_name: String,
    last_name: String,
    gender: GenderRow,
    birth_date: i64,
}

#[derive(Debug, Deserialize)]
struct UsersFile {
    users: Vec<UserRow>,
}

#[derive(Debug, Deserialize)]
struct LocationRow {
    id: u32,
    place: String,
    country: String,
    city: String,
    distance: i32,
}

#[derive(Debug, Deserialize)]
struct LocationsFile {
    locations: Vec<LocationRow>,
}

#[derive(Debug, Deserialize)]
struct VisitRow {
    id: u32,
    location: u32,
    user: u32,
    visited_at: i64,
    mark: i32,
}

#[derive(Debug, Deserialize)]
struct VisitsFile {
    visits: Vec<VisitRow>,
}

#[derive(Debug, Clone, Copy)]
struct Options {
    reference_time: i64,
    test_run: bool,
}

/// Load a dataset directory into a ready-to-serve store.
///
/// Capacity per entity kind is the highest loaded identifier plus one plus
/// `capacity_slack`, leaving room for post-load creates.
pub fn load_dir(dir: &Path, capacity_slack: usize) -> Result<Store> {
    let options = read_options(&dir.join("options.txt"))?;
    info!(
        reference_time = options.reference_time,
        test_run = options.test_run,
        "dataset options read"
    );

    let mut user_rows: Vec<UserRow> = Vec::new();
    for path in files_with_prefix(dir, "users")? {
        let file: UsersFile = read_json(&path)?;
        user_rows.extend(file.users);
    }

    let mut location_rows: Vec<LocationRow> = Vec::new();
    for path in files_with_prefix(dir, "locations")? {
        let file: LocationsFile = read_json(&path)?;
        location_rows.extend(file.locations);
    }

    let mut visit_rows: Vec<VisitRow> = Vec::new();
    for path in files_with_prefix(dir, "visits")? {
        let file: VisitsFile = read_json(&path)?;
        visit_rows.extend(file.visits);
    }

    let mut builder = Store::builder(
        capacity_for(user_rows.iter().map(|r| r.id), capacity_slack),
        capacity_for(location_rows.iter().map(|r| r.id), capacity_slack),
        capacity_for(visit_rows.iter().map(|r| r.id), capacity_slack),
        options.reference_time,
    );

    for row in user_rows {
        builder.put_user(UserRecord {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            gender: row.gender.into(),
            birth_date: row.birth_date,
        })?;
    }
    for row in location_rows {
        builder.put_location(LocationRecord {
            id: row.id,
            place: row.place,
            country: row.country,
            city: row.city,
            distance: row.distance,
        })?;
    }
    for row in visit_rows {
        builder.put_visit(VisitRecord {
            id: row.id,
            location: row.location,
            user: row.user,
            visited_at: row.visited_at,
            mark: row.mark,
        })?;
    }

    let store = builder.finish();
    let counts = store.counts();
    info!(
        users = counts.users,
        locations = counts.locations,
        visits = counts.visits,
        "dataset loaded"
    );
    Ok(store)
}

fn capacity_for(ids: impl Iterator<Item = u32>, slack: usize) -> usize {
    ids.map(|id| id as usize + 1).max().unwrap_or(0) + slack
}

fn read_options(path: &Path) -> Result<Options> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut lines = text.lines();
    let reference_time = lines
        .next()
        .context("options.txt is empty")?
        .trim()
        .parse()
        .context("options.txt first line is not a timestamp")?;
    let test_run = lines.next().map(|line| line.trim() == "0").unwrap_or(false);
    Ok(Options {
        reference_time,
        test_run,
    })
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("cannot read dataset dir {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(".json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("malformed dataset file {}", path.display()))
}
