//! Code for creating the user table, registering users, and authenticating them.

use std::fmt::Display;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's email address, stored lowercased.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// When the user registered.
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The email is lowercased before storage so that lookups are case-insensitive.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateEmail] if `email` already belongs to a registered user,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    email: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    let email = email.trim().to_lowercase();
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO user (email, password, created_at) VALUES (?1, ?2, ?3)",
        (&email, password_hash.as_ref(), created_at),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email,
        password_hash,
        created_at,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
/// This function will return an error if:
/// - `user_id` does not belong to a registered user,
/// - or there was an error trying to access the database.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, password, created_at FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user from the database with an email equal to `email` (case-insensitive).
///
/// # Errors
/// This function will return an error if:
/// - `email` does not belong to a registered user,
/// - or there was an error trying to access the database.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    let email = email.trim().to_lowercase();

    connection
        .prepare("SELECT id, email, password, created_at FROM user WHERE email = :email")?
        .query_row(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

/// Delete the user with `user_id` and, via the foreign key cascade, all of
/// their transactions.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `user_id` does not belong to a registered user,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM user WHERE id = ?1",
        (user_id.as_i64(),),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Look up the user for `email` and check `password` against the stored hash.
///
/// Both an unknown email and a wrong password are reported as
/// [Error::InvalidCredentials] so that the two cases cannot be told apart.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCredentials] if the email or password do not match,
/// - [Error::HashingError] if the stored hash could not be checked,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn authenticate(email: &str, password: &str, connection: &Connection) -> Result<User, Error> {
    let user = match get_user_by_email(email, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    match user.password_hash.verify(password) {
        Ok(true) => Ok(user),
        Ok(false) => Err(Error::InvalidCredentials),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

/// Get the number of users in the database.
///
/// # Errors
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| {
            row.get::<_, i64>(0).map(|count| count as usize)
        })
        .map_err(|error| error.into())
}

fn map_user_row(row: &rusqlite::Row) -> Result<User, rusqlite::Error> {
    let raw_id = row.get(0)?;
    let email = row.get(1)?;
    let raw_password_hash: String = row.get(2)?;
    let created_at = row.get(3)?;

    Ok(User {
        id: UserID::new(raw_id),
        email,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        created_at,
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash,
        user::{UserID, authenticate, count_users, create_user, get_user_by_email, get_user_by_id},
    };

    use super::create_user_table;

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    // The lowest cost bcrypt accepts, used to keep the tests fast.
    const MIN_COST: u32 = 4;

    fn test_password_hash() -> PasswordHash {
        PasswordHash::from_raw_password("averysecurepassword", MIN_COST)
            .expect("Could not hash password")
    }

    #[test]
    fn insert_user_succeeds() {
        let conn = get_db_connection();
        let password_hash = test_password_hash();

        let inserted_user = create_user("test@example.com", password_hash.clone(), &conn).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.email, "test@example.com");
        assert_eq!(inserted_user.password_hash, password_hash);
    }

    #[test]
    fn insert_user_fails_on_duplicate_email() {
        let conn = get_db_connection();
        create_user("test@example.com", test_password_hash(), &conn).unwrap();

        // Same email with different casing must still be rejected.
        let result = create_user("Test@Example.com", test_password_hash(), &conn);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let conn = get_db_connection();

        let id = UserID::new(42);

        assert_eq!(get_user_by_id(id, &conn), Err(Error::NotFound));
    }

    #[test]
    fn get_user_by_email_ignores_case() {
        let conn = get_db_connection();
        let test_user = create_user("test@example.com", test_password_hash(), &conn).unwrap();

        let retrieved_user = get_user_by_email("TEST@EXAMPLE.COM", &conn).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn authenticate_succeeds_with_correct_password() {
        let conn = get_db_connection();
        let test_user = create_user("test@example.com", test_password_hash(), &conn).unwrap();

        let authenticated = authenticate("test@example.com", "averysecurepassword", &conn).unwrap();

        assert_eq!(authenticated, test_user);
    }

    #[test]
    fn authenticate_fails_with_wrong_password() {
        let conn = get_db_connection();
        create_user("test@example.com", test_password_hash(), &conn).unwrap();

        let result = authenticate("test@example.com", "notthepassword", &conn);

        assert_eq!(result, Err(Error::InvalidCredentials));
    }

    #[test]
    fn authenticate_fails_with_unknown_email() {
        let conn = get_db_connection();

        let result = authenticate("nobody@example.com", "averysecurepassword", &conn);

        assert_eq!(result, Err(Error::InvalidCredentials));
    }

    #[test]
    fn returns_correct_count() {
        let conn = get_db_connection();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(0, count, "Want zero users before insertion, got {count}");

        create_user("test@example.com", test_password_hash(), &conn).unwrap();

        let count = count_users(&conn).expect("Could not get user count");
        assert_eq!(1, count, "Want one user after insertion, got {count}");
    }
}
