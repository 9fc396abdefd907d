//! OpenAPI 3 description of the HTTP surface, served at `/api-docs`

use serde_json::{json, Value};
use crate::sock::MAX_QUANTITY;

fn error_responses() -> Value {
    json!({
        "400": {
            "description": "Bad Request",
            "content": {"application/json": {"schema": {"oneOf": [
                {"$ref": "#/components/schemas/ErrorResponse"},
                {"$ref": "#/components/schemas/ErrorArrayResponse"}
            ]}}}
        },
        "404": {
            "description": "Not Found",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorResponse"}}}
        },
        "500": {
            "description": "Internal Server Error",
            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorResponse"}}}
        }
    })
}

/// Merge the shared error responses with an operation's own responses
fn responses(ok: Value) -> Value {
    let mut all = error_responses();
    if let (Some(all), Some(ok)) = (all.as_object_mut(), ok.as_object()) {
        for (code, response) in ok {
            all.insert(code.clone(), response.clone());
        }
    }
    all
}

fn json_body(schema: &str) -> Value {
    json!({
        "required": true,
        "content": {"application/json": {"schema": {"$ref": format!("#/components/schemas/{}", schema)}}}
    })
}

fn json_ok(schema: Value) -> Value {
    json!({"200": {"description": "OK", "content": {"application/json": {"schema": schema}}}})
}

fn id_param() -> Value {
    json!({"name": "id", "in": "path", "required": true, "schema": {"type": "integer", "format": "int64"}})
}

fn quantity_path() -> Value {
    json!({
        "get": {
            "summary": "Total quantity of socks matching a filter",
            "parameters": [
                {"name": "color", "in": "query", "required": true, "schema": {"type": "string"}, "example": "red"},
                {"name": "minCottonPercentage", "in": "query", "schema": {"type": "integer", "default": 0, "minimum": 0, "maximum": 100}},
                {"name": "maxCottonPercentage", "in": "query", "schema": {"type": "integer", "default": 100, "minimum": 0, "maximum": 100}}
            ],
            "responses": responses(json_ok(json!({"type": "integer", "format": "int64", "example": 10})))
        }
    })
}

fn movement_path(summary: &str, ok: Value) -> Value {
    json!({
        "post": {
            "summary": summary,
            "requestBody": json_body("SockRequest"),
            "responses": responses(json_ok(ok))
        }
    })
}

fn sock_by_id_path() -> Value {
    let sock = json!({"$ref": "#/components/schemas/Sock"});
    json!({
        "get": {
            "summary": "Get a stock position",
            "parameters": [id_param()],
            "responses": responses(json_ok(sock.clone()))
        },
        "put": {
            "summary": "Update a stock position",
            "parameters": [id_param()],
            "requestBody": json_body("SockRequest"),
            "responses": responses(json_ok(sock))
        }
    })
}

fn batch_path() -> Value {
    let upload = json!({
        "type": "object",
        "required": ["content"],
        "properties": {"content": {"type": "string", "format": "binary"}}
    });
    let ok = json!({
        "200": {"description": "OK", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ImportReport"}}}},
        "408": {"description": "Request Timeout", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ErrorResponse"}}}}
    });
    json!({
        "post": {
            "summary": "Import a CSV file of incoming socks",
            "description": "Header row names the columns color, cottonPercentage and quantity. Rows are committed one by one; invalid rows are reported and skipped.",
            "requestBody": {
                "required": true,
                "content": {"multipart/form-data": {"schema": upload}}
            },
            "responses": responses(ok)
        }
    })
}

fn health_path() -> Value {
    json!({
        "get": {
            "summary": "Liveness probe",
            "responses": json_ok(json!({"type": "object", "properties": {"status": {"type": "string"}}}))
        }
    })
}

fn sock_schema(with_id: bool) -> Value {
    let min_quantity = if with_id { 0 } else { 1 };
    let mut properties = json!({
        "color": {"type": "string", "example": "red"},
        "cottonPercentage": {"type": "integer", "minimum": 0, "maximum": 100, "example": 75},
        "quantity": {"type": "integer", "minimum": min_quantity, "maximum": MAX_QUANTITY, "example": 50}
    });
    let mut required = vec!["color", "cottonPercentage", "quantity"];
    if with_id {
        properties["id"] = json!({"type": "integer", "format": "int64"});
        required.insert(0, "id");
    }
    json!({"type": "object", "required": required, "properties": properties})
}

fn error_schema(array: bool) -> Value {
    let message = if array {
        json!({"type": "array", "items": {"type": "string"}})
    } else {
        json!({"type": "string"})
    };
    json!({
        "type": "object",
        "properties": {
            "status": {"type": "integer"},
            "error": {"type": "string"},
            "message": message
        }
    })
}

fn schemas() -> Value {
    json!({
        "Sock": sock_schema(true),
        "SockRequest": sock_schema(false),
        "RowError": {
            "type": "object",
            "required": ["row", "reason"],
            "properties": {
                "row": {"type": "integer", "description": "1-based data row, header excluded"},
                "column": {"type": "string"},
                "reason": {"type": "string"}
            }
        },
        "ImportReport": {
            "type": "object",
            "properties": {
                "rows": {"type": "integer"},
                "imported": {"type": "integer"},
                "failed": {"type": "integer"},
                "errors": {"type": "array", "items": {"$ref": "#/components/schemas/RowError"}},
                "cancelled": {"type": "boolean"}
            }
        },
        "ErrorResponse": error_schema(false),
        "ErrorArrayResponse": error_schema(true)
    })
}

pub fn document() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Sockshop API",
            "description": "Warehouse stock of socks by color and cotton percentage",
            "version": env!("CARGO_PKG_VERSION")
        },
        "paths": {
            "/api/socks": quantity_path(),
            "/api/socks/income": movement_path("Register incoming socks", json!({"$ref": "#/components/schemas/Sock"})),
            "/api/socks/outcome": movement_path("Register outgoing socks", json!({"type": "string"})),
            "/api/socks/{id}": sock_by_id_path(),
            "/api/socks/batch": batch_path(),
            "/health": health_path()
        },
        "components": {"schemas": schemas()}
    })
}
