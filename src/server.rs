//! HTTP listener: platform webhooks plus the management API.
//!
//! Routes:
//! - `GET  /health`
//! - `POST /api/social/{platform}/webhook/{bot_id}`
//! - `POST /token` (form `username`, `password`)
//! - `POST /users`, `GET /users`, `GET|PUT|DELETE /users/{id}`
//! - `POST /api/bots`, `GET /api/bots`, `GET|PUT /api/bots/{id}`
//! - `POST /api/bots/{id}/train`
//! - `GET  /api/bots/{id}/conversations/{conversation_id}/messages`
//! - `POST /api/scripts/upload`, `GET /api/scripts?bot_id=`, `DELETE /api/scripts/{id}`
//!
//! Everything except the webhooks, `/token` and `POST /users` needs an
//! `Authorization: Bearer <token>` header.

use std::io::Read;
use std::sync::Arc;
use std::thread;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{error, info, warn};

use crate::chatbot::engine::{BotService, ServiceError, DEFAULT_LIMIT};
use crate::chatbot::message::{BotUpdate, NewBot, Role, User};
use crate::chatbot::webhook::{self, Inbound};
use crate::trainer::TrainerError;

/// Request bodies beyond this are cut off.
const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Status and JSON body for a handled request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpReply {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn created(body: Value) -> Self {
        Self { status: 201, body }
    }

    fn no_content() -> Self {
        Self { status: 204, body: Value::Null }
    }

    fn error(status: u16, detail: impl Into<String>) -> Self {
        Self { status, body: json!({ "detail": detail.into() }) }
    }

    fn from_service(e: &ServiceError) -> Self {
        Self::error(status_for(e), e.to_string())
    }
}

/// One parsed request, free of any socket.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    /// Raw `Authorization` header, if any.
    pub authorization: Option<&'a str>,
    pub body: &'a str,
}

/// Serve on `addr` until the process exits. One thread per request.
pub fn serve(addr: &str, service: Arc<BotService>) -> Result<(), String> {
    let server = Server::http(addr).map_err(|e| format!("failed to bind {addr}: {e}"))?;
    info!("HTTP server listening on http://{}", addr);

    for mut request in server.incoming_requests() {
        let service = service.clone();
        thread::spawn(move || {
            let method = request.method().clone();
            let url = request.url().to_string();
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());

            let mut body = String::new();
            if let Err(e) = request.as_reader().take(MAX_BODY_BYTES).read_to_string(&mut body) {
                warn!("Failed to read body for {} {}: {}", method, url, e);
                let _ = request.respond(to_response(HttpReply::error(400, "unreadable body")));
                return;
            }

            let reply = handle_request(
                &service,
                Request { method: &method, url: &url, authorization: authorization.as_deref(), body: &body },
            );
            if reply.status >= 500 {
                error!("{} {} -> {}", method, url, reply.status);
            } else {
                info!("{} {} -> {}", method, url, reply.status);
            }
            if let Err(e) = request.respond(to_response(reply)) {
                warn!("Failed to send response: {e}");
            }
        });
    }

    Ok(())
}

fn to_response(reply: HttpReply) -> Response<std::io::Cursor<Vec<u8>>> {
    let body = if reply.body.is_null() { String::new() } else { reply.body.to_string() };
    let mut response = Response::from_string(body).with_status_code(StatusCode(reply.status));
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(header);
    }
    response
}

/// Route a request. Kept free of I/O so it can be exercised directly.
pub fn handle_request(service: &BotService, req: Request<'_>) -> HttpReply {
    let (path, query) = req.url.split_once('?').unwrap_or((req.url, ""));
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (req.method, segments.as_slice()) {
        (Method::Get, ["health"]) => HttpReply::ok(json!({ "status": "ok" })),
        (Method::Get, [""]) => HttpReply::ok(json!({ "message": "botforge server is running" })),
        (Method::Post, ["api", "social", platform, "webhook", bot_id]) => {
            handle_webhook(service, platform, bot_id, req.body)
        }
        (Method::Post, ["token"]) => login(service, req.body),
        (Method::Post, ["users"]) => register(service, req.body),
        _ => match authenticated(service, req.authorization) {
            Ok(actor) => route_api(service, &actor, req.method, &segments, query, req.body),
            Err(reply) => reply,
        },
    }
}

fn route_api(
    service: &BotService,
    actor: &User,
    method: &Method,
    segments: &[&str],
    query: &str,
    body: &str,
) -> HttpReply {
    let skip = query_usize(query, "skip").unwrap_or(0);
    let limit = query_usize(query, "limit").unwrap_or(DEFAULT_LIMIT);

    match (method, segments) {
        (Method::Get, ["users"]) => json_reply(service.list_users(actor)),
        (Method::Get, ["users", id]) => with_id(id, |id| json_reply(service.get_user(actor, id))),
        (Method::Put, ["users", id]) => with_id(id, |id| {
            with_body(body, |update: UserUpdate| {
                json_reply(service.update_user(actor, id, update.email.as_deref(), update.password.as_deref()))
            })
        }),
        (Method::Delete, ["users", id]) => with_id(id, |id| match service.delete_user(actor, id) {
            Ok(()) => HttpReply::no_content(),
            Err(e) => HttpReply::from_service(&e),
        }),

        (Method::Post, ["api", "bots"]) => with_body(body, |bot: NewBot| {
            created_reply(service.create_bot(actor, bot))
        }),
        (Method::Get, ["api", "bots"]) => json_reply(service.list_bots(actor, skip, limit)),
        (Method::Get, ["api", "bots", id]) => with_id(id, |id| json_reply(service.get_bot(actor, id))),
        (Method::Put, ["api", "bots", id]) => with_id(id, |id| {
            with_body(body, |update: BotUpdate| json_reply(service.update_bot(actor, id, update)))
        }),
        (Method::Post, ["api", "bots", id, "train"]) => with_id(id, |id| json_reply(service.train_bot(actor, id))),
        (Method::Get, ["api", "bots", bot_id, "conversations", conversation_id, "messages"]) => {
            with_id(bot_id, |bot_id| {
                with_id(conversation_id, |conversation_id| {
                    json_reply(service.conversation_history(actor, bot_id, conversation_id, limit))
                })
            })
        }

        (Method::Post, ["api", "scripts", "upload"]) => with_body(body, |upload: ScriptUpload| {
            created_reply(service.add_script(actor, upload.bot_id, &upload.content))
        }),
        (Method::Get, ["api", "scripts"]) => match query_param(query, "bot_id").and_then(|v| v.parse().ok()) {
            Some(bot_id) => json_reply(service.list_scripts(actor, bot_id, skip, limit)),
            None => HttpReply::error(400, "bot_id query parameter is required"),
        },
        (Method::Delete, ["api", "scripts", id]) => with_id(id, |id| match service.delete_script(actor, id) {
            Ok(_) => HttpReply::no_content(),
            Err(e) => HttpReply::from_service(&e),
        }),

        _ => HttpReply::error(404, "Not Found"),
    }
}

#[derive(Debug, Deserialize)]
struct Registration {
    username: String,
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct UserUpdate {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScriptUpload {
    bot_id: i64,
    content: String,
}

fn login(service: &BotService, body: &str) -> HttpReply {
    let form = parse_form(body);
    let field = |name: &str| form.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str());
    let (Some(username), Some(password)) = (field("username"), field("password")) else {
        return HttpReply::error(400, "username and password are required");
    };
    json_reply(service.login(username, password))
}

/// Open registration always creates plain users; admins come from `botctl`.
fn register(service: &BotService, body: &str) -> HttpReply {
    with_body(body, |r: Registration| {
        created_reply(service.register_user(&r.username, &r.email, &r.password, Role::User))
    })
}

fn authenticated(service: &BotService, authorization: Option<&str>) -> Result<User, HttpReply> {
    let token = authorization
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| HttpReply::error(401, "Not authenticated"))?;
    service.user_for_token(token).map_err(|e| HttpReply::from_service(&e))
}

fn json_reply<T: serde::Serialize>(result: Result<T, ServiceError>) -> HttpReply {
    reply_with(200, result)
}

fn created_reply<T: serde::Serialize>(result: Result<T, ServiceError>) -> HttpReply {
    reply_with(201, result)
}

fn reply_with<T: serde::Serialize>(status: u16, result: Result<T, ServiceError>) -> HttpReply {
    match result.map(|value| serde_json::to_value(value)) {
        Ok(Ok(body)) if status == 201 => HttpReply::created(body),
        Ok(Ok(body)) => HttpReply::ok(body),
        Ok(Err(e)) => HttpReply::error(500, format!("failed to encode response: {e}")),
        Err(e) => HttpReply::from_service(&e),
    }
}

fn with_id(raw: &str, f: impl FnOnce(i64) -> HttpReply) -> HttpReply {
    match raw.parse::<i64>() {
        Ok(id) => f(id),
        Err(_) => HttpReply::error(404, "Not Found"),
    }
}

fn with_body<T: DeserializeOwned>(body: &str, f: impl FnOnce(T) -> HttpReply) -> HttpReply {
    match serde_json::from_str(body) {
        Ok(value) => f(value),
        Err(e) => HttpReply::error(422, format!("invalid request body: {e}")),
    }
}

/// Decode an `application/x-www-form-urlencoded` string.
fn parse_form(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            Some((decode_component(key)?, decode_component(value)?))
        })
        .collect()
}

fn decode_component(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " ")).ok().map(|s| s.into_owned())
}

fn query_param(query: &str, name: &str) -> Option<String> {
    parse_form(query).into_iter().find(|(k, _)| k == name).map(|(_, v)| v)
}

fn query_usize(query: &str, name: &str) -> Option<usize> {
    query_param(query, name)?.parse().ok()
}

fn handle_webhook(service: &BotService, platform: &str, bot_id: &str, body: &str) -> HttpReply {
    let platform = match webhook::parse_platform(platform) {
        Ok(p) => p,
        Err(e) => return HttpReply::error(400, e.to_string()),
    };

    // Handshakes and non-message events are answered before the bot id is
    // looked at.
    let incoming = match webhook::parse_inbound(platform, body) {
        Ok(Inbound::Message(m)) => m,
        Ok(Inbound::Ping) => return HttpReply::ok(webhook::ping_reply()),
        Ok(Inbound::Ignored) => return HttpReply::ok(webhook::ignored_reply()),
        Err(e) => return HttpReply::error(400, e.to_string()),
    };

    let Ok(bot_id) = bot_id.parse::<i64>() else {
        return HttpReply::error(404, "Bot not found");
    };

    match service.handle_incoming(bot_id, &incoming) {
        Ok(reply) => HttpReply::ok(webhook::render_reply(bot_id, &incoming, &reply.text)),
        Err(e) => {
            warn!("Webhook handling failed for bot {}: {}", bot_id, e);
            HttpReply::from_service(&e)
        }
    }
}

fn status_for(e: &ServiceError) -> u16 {
    match e {
        ServiceError::NotFound(_) => 404,
        ServiceError::Forbidden(_) => 403,
        ServiceError::InvalidCredentials => 401,
        ServiceError::Conflict(_) => 409,
        ServiceError::Validation(_) => 400,
        ServiceError::Training(TrainerError::NoTrainingData { .. }) => 409,
        ServiceError::Training(_) | ServiceError::Database(_) => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbot::database::Database;
    use crate::chatbot::engine::ServiceConfig;
    use crate::chatbot::message::{NewBot, Role};

    fn service_with_bot(scripts: &[&str]) -> (BotService, i64) {
        let db = Arc::new(Database::in_memory().unwrap());
        let service = BotService::new(ServiceConfig::default(), db);
        let owner = service.register_user("owner", "owner@example.com", "password123", Role::User).unwrap();
        let bot = service.create_bot(&owner, NewBot { name: "shop".into(), ..Default::default() }).unwrap();
        for s in scripts {
            service.database().add_script(bot.id, s).unwrap();
        }
        (service, bot.id)
    }

    fn call(service: &BotService, method: Method, url: &str, token: Option<&str>, body: &str) -> HttpReply {
        let authorization = token.map(|t| format!("Bearer {t}"));
        handle_request(
            service,
            Request { method: &method, url, authorization: authorization.as_deref(), body },
        )
    }

    fn post(service: &BotService, url: &str, body: &str) -> HttpReply {
        call(service, Method::Post, url, None, body)
    }

    fn token_for(service: &BotService, username: &str, password: &str) -> String {
        let reply = post(service, "/token", &format!("username={username}&password={password}"));
        assert_eq!(reply.status, 200, "{:?}", reply.body);
        reply.body["access_token"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_health() {
        let (service, _) = service_with_bot(&[]);
        let reply = call(&service, Method::Get, "/health", None, "");
        assert_eq!(reply.status, 200);
    }

    #[test]
    fn test_unknown_route() {
        let (service, _) = service_with_bot(&[]);
        let token = token_for(&service, "owner", "password123");
        assert_eq!(call(&service, Method::Get, "/api/nothing", Some(&token), "").status, 404);
        assert_eq!(call(&service, Method::Get, "/api/social/whatsapp/webhook/1", Some(&token), "").status, 404);
    }

    #[test]
    fn test_whatsapp_webhook_replies() {
        let (service, bot_id) = service_with_bot(&["We open at nine every morning", "Shipping is free over fifty dollars"]);
        let body = r#"{"messages": [{"from": "555", "text": {"body": "is shipping free?"}}]}"#;
        let url = format!("/api/social/whatsapp/webhook/{bot_id}");
        let reply = post(&service, &url, body);
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["messages"][0]["text"]["body"], "Shipping is free over fifty dollars");
        assert_eq!(reply.body["messages"][0]["to"], "555");
    }

    #[test]
    fn test_unsupported_platform() {
        let (service, bot_id) = service_with_bot(&["hello"]);
        let url = format!("/api/social/myspace/webhook/{bot_id}");
        let reply = post(&service, &url, "{}");
        assert_eq!(reply.status, 400);
        assert!(reply.body["detail"].as_str().unwrap().contains("myspace"));
    }

    #[test]
    fn test_unknown_bot() {
        let (service, _) = service_with_bot(&["hello"]);
        let body = r#"{"message": {"chat": {"id": 1}, "text": "hi"}}"#;
        assert_eq!(post(&service, "/api/social/telegram/webhook/999", body).status, 404);
        assert_eq!(post(&service, "/api/social/telegram/webhook/abc", body).status, 404);
    }

    #[test]
    fn test_bot_without_scripts() {
        let (service, bot_id) = service_with_bot(&[]);
        let body = r#"{"message": {"chat": {"id": 1}, "text": "hi"}}"#;
        let url = format!("/api/social/telegram/webhook/{bot_id}");
        assert_eq!(post(&service, &url, body).status, 409);
    }

    #[test]
    fn test_discord_ping_skips_bot_lookup() {
        let (service, _) = service_with_bot(&[]);
        let reply = post(&service, "/api/social/discord/webhook/999", r#"{"type": 1}"#);
        assert_eq!(reply, HttpReply::ok(json!({"type": 1})));
    }

    #[test]
    fn test_discord_ping_with_non_numeric_bot_id() {
        let (service, _) = service_with_bot(&[]);
        let reply = post(&service, "/api/social/discord/webhook/abc", r#"{"type": 1}"#);
        assert_eq!(reply, HttpReply::ok(json!({"type": 1})));
    }

    #[test]
    fn test_ignored_event_with_non_numeric_bot_id() {
        let (service, _) = service_with_bot(&[]);
        let reply = post(&service, "/api/social/whatsapp/webhook/not-a-bot", r#"{"statuses": []}"#);
        assert_eq!(reply, HttpReply::ok(webhook::ignored_reply()));
    }

    #[test]
    fn test_malformed_body() {
        let (service, bot_id) = service_with_bot(&["hello"]);
        let url = format!("/api/social/instagram/webhook/{bot_id}?hub.mode=x");
        assert_eq!(post(&service, &url, "not json").status, 400);
    }

    #[test]
    fn test_token_login() {
        let (service, _) = service_with_bot(&[]);
        let reply = post(&service, "/token", "username=owner&password=password123");
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["token_type"], "bearer");

        let reply = post(&service, "/token", "username=owner&password=wrong");
        assert_eq!(reply.status, 401);
        assert_eq!(post(&service, "/token", "username=owner").status, 400);
    }

    #[test]
    fn test_token_form_is_url_decoded() {
        let (service, _) = service_with_bot(&[]);
        service.register_user("spaced", "spaced@example.com", "pass word&1=", Role::User).unwrap();
        token_for(&service, "spaced", "pass+word%261%3D");
    }

    #[test]
    fn test_api_requires_bearer_token() {
        let (service, _) = service_with_bot(&[]);
        assert_eq!(call(&service, Method::Get, "/api/bots", None, "").status, 401);
        assert_eq!(call(&service, Method::Get, "/api/bots", Some("forged"), "").status, 401);

        let reply = handle_request(
            &service,
            Request { method: &Method::Get, url: "/api/bots", authorization: Some("Basic b3duZXI6eA=="), body: "" },
        );
        assert_eq!(reply.status, 401);
    }

    #[test]
    fn test_register_and_read_self() {
        let (service, _) = service_with_bot(&[]);
        let body = r#"{"username": "alice", "email": "alice@example.com", "password": "wonderland"}"#;
        let reply = post(&service, "/users", body);
        assert_eq!(reply.status, 201);
        assert_eq!(reply.body["role"], "user");
        assert!(reply.body.get("password_hash").is_none());

        let id = reply.body["id"].as_i64().unwrap();
        let token = token_for(&service, "alice", "wonderland");
        let me = call(&service, Method::Get, &format!("/users/{id}"), Some(&token), "");
        assert_eq!(me.body["username"], "alice");

        assert_eq!(post(&service, "/users", body).status, 409);
        assert_eq!(post(&service, "/users", "{}").status, 422);
        assert_eq!(call(&service, Method::Get, "/users", Some(&token), "").status, 403);
    }

    #[test]
    fn test_admin_deletes_user() {
        let (service, _) = service_with_bot(&[]);
        service.register_user("root", "root@example.com", "password123", Role::Admin).unwrap();
        let victim = service.register_user("victim", "victim@example.com", "password123", Role::User).unwrap();
        let admin = token_for(&service, "root", "password123");
        let victim_token = token_for(&service, "victim", "password123");

        let users = call(&service, Method::Get, "/users", Some(&admin), "");
        assert_eq!(users.body.as_array().unwrap().len(), 3);

        let reply = call(&service, Method::Delete, &format!("/users/{}", victim.id), Some(&admin), "");
        assert_eq!(reply, HttpReply::no_content());
        assert_eq!(call(&service, Method::Get, "/api/bots", Some(&victim_token), "").status, 401);
    }

    #[test]
    fn test_bot_lifecycle_over_http() {
        let (service, _) = service_with_bot(&[]);
        let token = token_for(&service, "owner", "password123");
        let auth = Some(token.as_str());

        let created = call(&service, Method::Post, "/api/bots", auth, r#"{"name": "helpdesk", "personality": "calm"}"#);
        assert_eq!(created.status, 201);
        let bot_id = created.body["id"].as_i64().unwrap();

        let untrained = call(&service, Method::Post, &format!("/api/bots/{bot_id}/train"), auth, "");
        assert_eq!(untrained.status, 409);

        let upload = format!(r#"{{"bot_id": {bot_id}, "content": "Reset your password from the login page"}}"#);
        let script = call(&service, Method::Post, "/api/scripts/upload", auth, &upload);
        assert_eq!(script.status, 201);
        let second = format!(r#"{{"bot_id": {bot_id}, "content": "Invoices are emailed monthly"}}"#);
        call(&service, Method::Post, "/api/scripts/upload", auth, &second);

        let trained = call(&service, Method::Post, &format!("/api/bots/{bot_id}/train"), auth, "");
        assert_eq!(trained.status, 200);
        assert_eq!(trained.body["status"], "success");
        assert_eq!(trained.body["personality_profile"]["distinct_terms"], 11);

        let bot = call(&service, Method::Get, &format!("/api/bots/{bot_id}"), auth, "");
        assert_eq!(bot.body["trained_at"], trained.body["trained_at"]);

        let renamed = call(&service, Method::Put, &format!("/api/bots/{bot_id}"), auth, r#"{"name": "support"}"#);
        assert_eq!(renamed.body["name"], "support");

        let listed = call(&service, Method::Get, "/api/bots?skip=0&limit=1", auth, "");
        assert_eq!(listed.body.as_array().unwrap().len(), 1);

        let scripts = call(&service, Method::Get, &format!("/api/scripts?bot_id={bot_id}"), auth, "");
        assert_eq!(scripts.body.as_array().unwrap().len(), 2);
        assert_eq!(call(&service, Method::Get, "/api/scripts", auth, "").status, 400);

        let script_id = script.body["id"].as_i64().unwrap();
        let deleted = call(&service, Method::Delete, &format!("/api/scripts/{script_id}"), auth, "");
        assert_eq!(deleted.status, 204);
        let scripts = call(&service, Method::Get, &format!("/api/scripts?bot_id={bot_id}&limit=10"), auth, "");
        assert_eq!(scripts.body.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_other_users_bot_is_forbidden() {
        let (service, bot_id) = service_with_bot(&["hello there"]);
        service.register_user("mallory", "mallory@example.com", "password123", Role::User).unwrap();
        let token = token_for(&service, "mallory", "password123");

        assert_eq!(call(&service, Method::Get, &format!("/api/bots/{bot_id}"), Some(&token), "").status, 403);
        assert_eq!(call(&service, Method::Post, &format!("/api/bots/{bot_id}/train"), Some(&token), "").status, 403);
        let listed = call(&service, Method::Get, "/api/bots", Some(&token), "");
        assert_eq!(listed.body, json!([]));
    }

    #[test]
    fn test_conversation_messages_over_http() {
        let (service, bot_id) = service_with_bot(&["We open at nine every morning"]);
        let body = r#"{"message": {"chat": {"id": 42}, "text": "when do you open"}}"#;
        post(&service, &format!("/api/social/telegram/webhook/{bot_id}"), body);
        let conversation_id = service.database().list_conversations(bot_id).unwrap()[0].id;

        let token = token_for(&service, "owner", "password123");
        let url = format!("/api/bots/{bot_id}/conversations/{conversation_id}/messages?limit=10");
        let reply = call(&service, Method::Get, &url, Some(&token), "");
        assert_eq!(reply.status, 200);
        let messages = reply.body.as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["is_from_user"], true);
        assert_eq!(messages[1]["content"], "We open at nine every morning");
    }

    #[test]
    fn test_parse_form() {
        assert_eq!(
            parse_form("a=1&b=hello+world&c=%C3%A9&d"),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "hello world".to_string()),
                ("c".to_string(), "é".to_string()),
                ("d".to_string(), String::new()),
            ]
        );
        assert!(parse_form("").is_empty());
    }
}
