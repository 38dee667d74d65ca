//! Schema and demo data.
//!
//! All statements are idempotent so opening an existing database is safe.

use tokio_rusqlite::rusqlite::{self, params, Connection};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY,
    image_url TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
);
CREATE TABLE IF NOT EXISTS likes (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, post_id)
);
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY,
    text TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    date TEXT NOT NULL,
    image TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS meals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    image TEXT NOT NULL,
    summary TEXT NOT NULL,
    instructions TEXT NOT NULL,
    creator TEXT NOT NULL,
    creator_email TEXT NOT NULL
);
";

const USERS: &[(i64, &str, &str, &str)] = &[
    (1, "John", "Doe", "john@example.com"),
    (2, "Jane", "Doe", "jane@example.com"),
];

const POSTS: &[(i64, &str, &str, &str, &str, i64)] = &[
    (
        1,
        "/images/post-1.png",
        "A first post",
        "Hello from the feed.",
        "2024-05-01 09:00:00",
        1,
    ),
    (
        2,
        "/images/post-2.png",
        "Cooking pasta",
        "Salt the water generously.",
        "2024-05-03 18:30:00",
        2,
    ),
];

/// Likes seeded so both states of the like toggle are present.
const LIKES: &[(i64, i64)] = &[(1, 1), (2, 2), (1, 2)];

const NEWS: &[(&str, &str, &str, &str, &str)] = &[
    (
        "will-ai-replace-humans",
        "Will AI Replace Humans?",
        "Experts keep disagreeing.",
        "2021-07-01",
        "ai-robot.jpg",
    ),
    (
        "beaver-plague",
        "A Plague of Beavers",
        "Dams everywhere.",
        "2022-05-01",
        "beaver.jpg",
    ),
    (
        "couple-cooking",
        "Spend more time together!",
        "Cooking together is fun.",
        "2024-03-01",
        "couple-cooking.jpg",
    ),
    (
        "hiking",
        "Hiking is the best!",
        "Hiking keeps you fit.",
        "2024-01-01",
        "hiking.jpg",
    ),
    (
        "landscape",
        "The beauty of landscape",
        "Landscape photography is a great hobby.",
        "2022-07-01",
        "landscape.jpg",
    ),
];

/// (slug, title, image, summary, instructions, creator, creator_email)
const MEALS: &[(&str, &str, &str, &str, &str, &str, &str)] = &[
    (
        "juicy-cheese-burger",
        "Juicy Cheese Burger",
        "/images/burger.jpg",
        "A mouth-watering burger with a juicy beef patty and melted cheese.",
        "1. Form the patties.\n2. Cook them for 4 minutes per side.\n3. Add cheese and serve.",
        "John Doe",
        "johndoe@example.com",
    ),
    (
        "spicy-curry",
        "Spicy Curry",
        "/images/curry.jpg",
        "A rich and spicy curry, infused with exotic spices and creamy coconut milk.",
        "1. Chop the vegetables.\n2. Simmer with spices and coconut milk.\n3. Serve with rice.",
        "Max Schwarz",
        "max@example.com",
    ),
    (
        "homemade-dumplings",
        "Homemade Dumplings",
        "/images/dumplings.jpg",
        "Tender dumplings filled with savory meat and vegetables, steamed to perfection.",
        "1. Prepare the filling.\n2. Fill and fold the wrappers.\n3. Steam for 10 minutes.",
        "Emily Chen",
        "emilychen@example.com",
    ),
];

/// Creates all tables.
pub(super) fn create(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA)
}

/// Inserts demo rows; rows already present are left alone.
pub(super) fn seed_demo_data(conn: &Connection) -> Result<(), rusqlite::Error> {
    for (id, first, last, email) in USERS {
        conn.execute(
            "INSERT OR IGNORE INTO users (id, first_name, last_name, email) VALUES (?1, ?2, ?3, ?4)",
            params![id, first, last, email],
        )?;
    }
    for (id, image, title, content, created_at, user_id) in POSTS {
        conn.execute(
            "INSERT OR IGNORE INTO posts (id, image_url, title, content, created_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, image, title, content, created_at, user_id],
        )?;
    }
    for (user_id, post_id) in LIKES {
        conn.execute(
            "INSERT OR IGNORE INTO likes (user_id, post_id) VALUES (?1, ?2)",
            params![user_id, post_id],
        )?;
    }
    for (slug, title, content, date, image) in NEWS {
        conn.execute(
            "INSERT OR IGNORE INTO news (slug, title, content, date, image) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![slug, title, content, date, image],
        )?;
    }
    for (slug, title, image, summary, instructions, creator, email) in MEALS {
        conn.execute(
            "INSERT OR IGNORE INTO meals (slug, title, image, summary, instructions, creator, creator_email)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![slug, title, image, summary, instructions, creator, email],
        )?;
    }
    Ok(())
}
