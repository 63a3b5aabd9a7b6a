//! Parameterized queries over the `books` table.

use bookshelf_db::Database;
use thiserror::Error;

use super::models::{Book, BookChanges};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("a book with isbn '{0}' already exists")]
    DuplicateIsbn(String),

    #[error("book storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage gateway for books. Not-found is `None` or a zero count, never an
/// error.
#[derive(Clone, Debug)]
pub struct BookRepository {
    db: Database,
}

impl BookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn ping(&self) -> RepositoryResult<()> {
        Ok(self.db.ping().await?)
    }

    /// Every book, oldest insert first.
    pub async fn list_all(&self) -> RepositoryResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT isbn, amazon_url, author, language, pages, publisher, title, year
             FROM books
             ORDER BY rowid",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(books)
    }

    pub async fn get_by_isbn(&self, isbn: &str) -> RepositoryResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(
            "SELECT isbn, amazon_url, author, language, pages, publisher, title, year
             FROM books
             WHERE isbn = ?",
        )
        .bind(isbn)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(book)
    }

    /// Insert a new row and return it as stored. An existing isbn is left
    /// untouched and reported as `DuplicateIsbn`.
    pub async fn insert(&self, book: &Book) -> RepositoryResult<Book> {
        let inserted = sqlx::query_as::<_, Book>(
            "INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (isbn) DO NOTHING
             RETURNING isbn, amazon_url, author, language, pages, publisher, title, year",
        )
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_optional(self.db.pool())
        .await?;

        inserted.ok_or_else(|| RepositoryError::DuplicateIsbn(book.isbn.clone()))
    }

    /// Overwrite every mutable column of the row keyed by `isbn`.
    pub async fn update(
        &self,
        isbn: &str,
        changes: &BookChanges,
    ) -> RepositoryResult<Option<Book>> {
        let updated = sqlx::query_as::<_, Book>(
            "UPDATE books
             SET amazon_url = ?, author = ?, language = ?, pages = ?,
                 publisher = ?, title = ?, year = ?
             WHERE isbn = ?
             RETURNING isbn, amazon_url, author, language, pages, publisher, title, year",
        )
        .bind(&changes.amazon_url)
        .bind(&changes.author)
        .bind(&changes.language)
        .bind(changes.pages)
        .bind(&changes.publisher)
        .bind(&changes.title)
        .bind(changes.year)
        .bind(isbn)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(updated)
    }

    /// Remove the row keyed by `isbn`; returns how many rows went away.
    pub async fn delete_by_isbn(&self, isbn: &str) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM books WHERE isbn = ?")
            .bind(isbn)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
