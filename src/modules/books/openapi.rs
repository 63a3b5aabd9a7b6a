//! OpenAPI fragment for the books module.

use serde_json::{json, Value};

use super::validation::DEFAULT_ISBN_MIN_LEN;

fn json_response(description: &str, schema: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{}", schema) }
            }
        }
    })
}

fn error(description: &str) -> Value {
    json_response(description, "ErrorResponse")
}

fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": format!("#/components/schemas/{}", schema) }
            }
        }
    })
}

fn isbn_param() -> Value {
    json!([{
        "name": "isbn",
        "in": "path",
        "required": true,
        "schema": { "type": "string" }
    }])
}

pub(super) fn collection_path() -> Value {
    json!({
        "get": {
            "summary": "List books",
            "tags": ["Books"],
            "responses": {
                "200": json_response("Every book", "BookListResponse"),
                "500": error("Internal server error")
            }
        },
        "post": {
            "summary": "Create a book",
            "tags": ["Books"],
            "requestBody": json_body("Book"),
            "responses": {
                "201": json_response("Book created", "BookResponse"),
                "400": error("Invalid book payload"),
                "409": error("A book with this isbn already exists"),
                "500": error("Internal server error")
            }
        }
    })
}

pub(super) fn health_path() -> Value {
    json!({
        "get": {
            "summary": "Books health check",
            "tags": ["Books"],
            "responses": {
                "200": {
                    "description": "OK",
                    "content": { "text/plain": { "schema": { "type": "string" } } }
                },
                "500": error("Database unreachable")
            }
        }
    })
}

pub(super) fn item_path() -> Value {
    let deleted = json!({
        "description": "Book deleted",
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": { "message": { "type": "string" } },
                    "required": ["message"]
                }
            }
        }
    });

    json!({
        "get": {
            "summary": "Get a book",
            "tags": ["Books"],
            "parameters": isbn_param(),
            "responses": {
                "200": json_response("The book", "BookResponse"),
                "404": error("No book with this isbn"),
                "500": error("Internal server error")
            }
        },
        "put": {
            "summary": "Replace every mutable field of a book",
            "tags": ["Books"],
            "parameters": isbn_param(),
            "requestBody": json_body("BookChanges"),
            "responses": {
                "200": json_response("Book updated", "BookResponse"),
                "400": error("Invalid book payload"),
                "404": error("No book with this isbn"),
                "500": error("Internal server error")
            }
        },
        "delete": {
            "summary": "Delete a book",
            "tags": ["Books"],
            "parameters": isbn_param(),
            "responses": {
                "200": deleted,
                "404": error("No book with this isbn"),
                "500": error("Internal server error")
            }
        }
    })
}

fn mutable_properties() -> Value {
    json!({
        "amazon_url": { "type": "string", "format": "uri" },
        "author": { "type": "string" },
        "language": { "type": "string" },
        "pages": { "type": "integer", "minimum": 0 },
        "publisher": { "type": "string" },
        "title": { "type": "string" },
        "year": { "type": "integer", "minimum": 0 }
    })
}

pub(super) fn schemas() -> Value {
    let mut book_properties = mutable_properties();
    book_properties["isbn"] = json!({ "type": "string", "minLength": DEFAULT_ISBN_MIN_LEN });

    let mutable = ["amazon_url", "author", "language", "pages", "publisher", "title", "year"];
    let mut all = vec!["isbn"];
    all.extend(mutable);

    json!({
        "Book": {
            "type": "object",
            "properties": book_properties,
            "required": all
        },
        "BookChanges": {
            "type": "object",
            "properties": mutable_properties(),
            "required": mutable
        },
        "BookResponse": {
            "type": "object",
            "properties": { "book": { "$ref": "#/components/schemas/Book" } },
            "required": ["book"]
        },
        "BookListResponse": {
            "type": "object",
            "properties": {
                "books": {
                    "type": "array",
                    "items": { "$ref": "#/components/schemas/Book" }
                }
            },
            "required": ["books"]
        }
    })
}
