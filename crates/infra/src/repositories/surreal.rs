use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use skillswap_domain::DomainResult;
use skillswap_domain::agreements::{Agreement, AgreementStatus};
use skillswap_domain::chat::{ChatMessage, MessageWindow};
use skillswap_domain::error::DomainError;
use skillswap_domain::ports::BoxFuture;
use skillswap_domain::ports::agreements::AgreementRepository;
use skillswap_domain::ports::chat::ChatMessageRepository;
use skillswap_domain::ports::requests::RequestRepository;
use skillswap_domain::ports::users::UserRepository;
use skillswap_domain::requests::{NegotiationNote, RequestStatus, ServiceRequest};
use skillswap_domain::users::{ExpertiseLevel, OtpCode, User};

fn parse_rfc3339(value: &str) -> DomainResult<i64> {
    let dt = OffsetDateTime::parse(value, &Rfc3339)
        .map_err(|err| DomainError::Upstream(format!("invalid timestamp in row: {err}")))?;
    Ok((dt.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn to_rfc3339(epoch_ms: i64) -> DomainResult<String> {
    let dt = OffsetDateTime::from_unix_timestamp_nanos(epoch_ms as i128 * 1_000_000)
        .map_err(|err| DomainError::Validation(format!("invalid ms timestamp: {err}")))?;
    Ok(dt
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string()))
}

fn map_surreal_error(err: surrealdb::Error) -> DomainError {
    let error_message = err.to_string().to_lowercase();
    if error_message.contains("already exists")
        || error_message.contains("duplicate")
        || error_message.contains("unique")
        || error_message.contains("conflict")
    {
        return DomainError::Conflict;
    }
    // Anything else is the store misbehaving, not the client.
    DomainError::Upstream(format!("surreal query failed: {error_message}"))
}

fn take_rows(response: &mut surrealdb::Response) -> DomainResult<Vec<Value>> {
    response
        .take(0)
        .map_err(|err| DomainError::Upstream(format!("invalid query result: {err}")))
}

const USER_SELECT: &str = "SELECT user_id, name, email, password_hash, skills, \
        expertise_level, is_verified, \
        IF otp_code = NONE { NONE } ELSE { otp_code } AS otp_code, \
        IF otp_expires_at = NONE { NONE } ELSE { <string>otp_expires_at } AS otp_expires_at, \
        portfolio, <string>created_at AS created_at \
 FROM user";

#[derive(Debug, Deserialize)]
struct SurrealUserRow {
    user_id: String,
    name: String,
    email: String,
    password_hash: String,
    skills: Vec<String>,
    expertise_level: ExpertiseLevel,
    is_verified: bool,
    otp_code: Option<String>,
    otp_expires_at: Option<String>,
    portfolio: Vec<String>,
    created_at: String,
}

impl SurrealUserRow {
    fn into_user(self) -> DomainResult<User> {
        let otp = match (self.otp_code, self.otp_expires_at) {
            (Some(code), Some(expires_at)) => Some(OtpCode {
                code,
                expires_at_ms: parse_rfc3339(&expires_at)?,
            }),
            _ => None,
        };
        Ok(User {
            user_id: self.user_id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            skills: self.skills,
            expertise_level: self.expertise_level,
            is_verified: self.is_verified,
            otp,
            portfolio: self.portfolio,
            created_at_ms: parse_rfc3339(&self.created_at)?,
        })
    }
}

fn decode_user_rows(rows: Vec<Value>) -> DomainResult<Vec<User>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value::<SurrealUserRow>(row)
                .map_err(|err| DomainError::Upstream(format!("invalid user row: {err}")))
                .and_then(SurrealUserRow::into_user)
        })
        .collect()
}

pub struct SurrealUserRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealUserRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    async fn fetch_one(
        client: &Surreal<Client>,
        field: &'static str,
        value: String,
    ) -> DomainResult<Option<User>> {
        let query = format!("{USER_SELECT} WHERE {field} = ${field} LIMIT 1");
        let mut response = client
            .query(query)
            .bind((field, value))
            .await
            .map_err(map_surreal_error)?;
        let rows = take_rows(&mut response)?;
        Ok(decode_user_rows(rows)?.pop())
    }
}

impl UserRepository for SurrealUserRepository {
    fn create(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let client = self.client.clone();
        Box::pin(async move {
            if Self::fetch_one(&client, "email", user.email.clone())
                .await?
                .is_some()
            {
                return Err(DomainError::Conflict);
            }

            let created_at = to_rfc3339(user.created_at_ms)?;
            let mut query = String::from(
                "CREATE user SET \
                    user_id = $user_id, \
                    name = $name, \
                    email = $email, \
                    password_hash = $password_hash, \
                    skills = $skills, \
                    expertise_level = $expertise_level, \
                    is_verified = $is_verified, \
                    portfolio = $portfolio, \
                    created_at = <datetime>$created_at",
            );
            if user.otp.is_some() {
                query.push_str(
                    ", otp_code = $otp_code, otp_expires_at = <datetime>$otp_expires_at",
                );
            } else {
                query.push_str(", otp_code = NONE, otp_expires_at = NONE");
            }
            query.push(';');

            let mut pending = client.query(query);
            pending = pending.bind(("user_id", user.user_id.clone()));
            pending = pending.bind(("name", user.name.clone()));
            pending = pending.bind(("email", user.email.clone()));
            pending = pending.bind(("password_hash", user.password_hash.clone()));
            pending = pending.bind(("skills", user.skills.clone()));
            pending = pending.bind(("expertise_level", user.expertise_level));
            pending = pending.bind(("is_verified", user.is_verified));
            pending = pending.bind(("portfolio", user.portfolio.clone()));
            pending = pending.bind(("created_at", created_at));
            if let Some(otp) = &user.otp {
                pending = pending.bind(("otp_code", otp.code.clone()));
                pending = pending.bind(("otp_expires_at", to_rfc3339(otp.expires_at_ms)?));
            }
            pending.await.map_err(map_surreal_error)?;

            Self::fetch_one(&client, "user_id", user.user_id.clone())
                .await?
                .ok_or_else(|| DomainError::Validation("create returned no row".to_string()))
        })
    }

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let user_id = user_id.to_string();
        let client = self.client.clone();
        Box::pin(async move { Self::fetch_one(&client, "user_id", user_id).await })
    }

    fn get_by_email(&self, email: &str) -> BoxFuture<'_, DomainResult<Option<User>>> {
        let email = email.to_string();
        let client = self.client.clone();
        Box::pin(async move { Self::fetch_one(&client, "email", email).await })
    }

    fn update(&self, user: &User) -> BoxFuture<'_, DomainResult<User>> {
        let user = user.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let mut query = String::from(
                "UPDATE user SET \
                    name = $name, \
                    email = $email, \
                    password_hash = $password_hash, \
                    skills = $skills, \
                    expertise_level = $expertise_level, \
                    is_verified = $is_verified, \
                    portfolio = $portfolio",
            );
            if user.otp.is_some() {
                query.push_str(
                    ", otp_code = $otp_code, otp_expires_at = <datetime>$otp_expires_at",
                );
            } else {
                query.push_str(", otp_code = NONE, otp_expires_at = NONE");
            }
            query.push_str(" WHERE user_id = $user_id;");

            let mut pending = client.query(query);
            pending = pending.bind(("user_id", user.user_id.clone()));
            pending = pending.bind(("name", user.name.clone()));
            pending = pending.bind(("email", user.email.clone()));
            pending = pending.bind(("password_hash", user.password_hash.clone()));
            pending = pending.bind(("skills", user.skills.clone()));
            pending = pending.bind(("expertise_level", user.expertise_level));
            pending = pending.bind(("is_verified", user.is_verified));
            pending = pending.bind(("portfolio", user.portfolio.clone()));
            if let Some(otp) = &user.otp {
                pending = pending.bind(("otp_code", otp.code.clone()));
                pending = pending.bind(("otp_expires_at", to_rfc3339(otp.expires_at_ms)?));
            }
            pending.await.map_err(map_surreal_error)?;

            Self::fetch_one(&client, "user_id", user.user_id.clone())
                .await?
                .ok_or(DomainError::NotFound)
        })
    }

    fn list_with_any_skill(
        &self,
        skills: &[String],
        exclude_user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<User>>> {
        let skills: Vec<String> = skills.to_vec();
        let exclude = exclude_user_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let query = format!(
                "{USER_SELECT} WHERE user_id != $exclude AND skills ANYINSIDE $skills \
                 ORDER BY user_id ASC"
            );
            let mut response = client
                .query(query)
                .bind(("exclude", exclude))
                .bind(("skills", skills))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response)?;
            decode_user_rows(rows)
        })
    }

    fn list_with_skill(
        &self,
        skill: &str,
        exclude_user_id: &str,
    ) -> BoxFuture<'_, DomainResult<Vec<User>>> {
        let skill = skill.to_string();
        let exclude = exclude_user_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let query = format!(
                "{USER_SELECT} WHERE user_id != $exclude AND $skill INSIDE skills \
                 ORDER BY user_id ASC"
            );
            let mut response = client
                .query(query)
                .bind(("exclude", exclude))
                .bind(("skill", skill))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response)?;
            decode_user_rows(rows)
        })
    }
}

const REQUEST_SELECT: &str = "SELECT request_id, owner_id, title, description, skills_needed, \
        status, negotiation_notes, <string>created_at AS created_at, \
        <string>updated_at AS updated_at \
 FROM service_request";

#[derive(Debug, Deserialize)]
struct SurrealRequestRow {
    request_id: String,
    owner_id: String,
    title: String,
    description: String,
    skills_needed: Vec<String>,
    status: RequestStatus,
    #[serde(default)]
    negotiation_notes: Vec<NegotiationNote>,
    created_at: String,
    updated_at: String,
}

impl SurrealRequestRow {
    fn into_request(self) -> DomainResult<ServiceRequest> {
        Ok(ServiceRequest {
            request_id: self.request_id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            skills_needed: self.skills_needed,
            status: self.status,
            negotiation_notes: self.negotiation_notes,
            created_at_ms: parse_rfc3339(&self.created_at)?,
            updated_at_ms: parse_rfc3339(&self.updated_at)?,
        })
    }
}

fn decode_request_rows(rows: Vec<Value>) -> DomainResult<Vec<ServiceRequest>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value::<SurrealRequestRow>(row)
                .map_err(|err| DomainError::Upstream(format!("invalid request row: {err}")))
                .and_then(SurrealRequestRow::into_request)
        })
        .collect()
}

pub struct SurrealRequestRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealRequestRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    async fn fetch_one(
        client: &Surreal<Client>,
        request_id: String,
    ) -> DomainResult<Option<ServiceRequest>> {
        let query = format!("{REQUEST_SELECT} WHERE request_id = $request_id LIMIT 1");
        let mut response = client
            .query(query)
            .bind(("request_id", request_id))
            .await
            .map_err(map_surreal_error)?;
        let rows = take_rows(&mut response)?;
        Ok(decode_request_rows(rows)?.pop())
    }
}

impl RequestRepository for SurrealRequestRepository {
    fn create(&self, request: &ServiceRequest) -> BoxFuture<'_, DomainResult<ServiceRequest>> {
        let request = request.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let created_at = to_rfc3339(request.created_at_ms)?;
            let updated_at = to_rfc3339(request.updated_at_ms)?;
            client
                .query(
                    "CREATE service_request SET \
                        request_id = $request_id, \
                        owner_id = $owner_id, \
                        title = $title, \
                        description = $description, \
                        skills_needed = $skills_needed, \
                        status = $status, \
                        negotiation_notes = $negotiation_notes, \
                        created_at = <datetime>$created_at, \
                        updated_at = <datetime>$updated_at;",
                )
                .bind(("request_id", request.request_id.clone()))
                .bind(("owner_id", request.owner_id.clone()))
                .bind(("title", request.title.clone()))
                .bind(("description", request.description.clone()))
                .bind(("skills_needed", request.skills_needed.clone()))
                .bind(("status", request.status))
                .bind(("negotiation_notes", request.negotiation_notes.clone()))
                .bind(("created_at", created_at))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;

            Self::fetch_one(&client, request.request_id.clone())
                .await?
                .ok_or_else(|| DomainError::Validation("create returned no row".to_string()))
        })
    }

    fn get(&self, request_id: &str) -> BoxFuture<'_, DomainResult<Option<ServiceRequest>>> {
        let request_id = request_id.to_string();
        let client = self.client.clone();
        Box::pin(async move { Self::fetch_one(&client, request_id).await })
    }

    fn update(&self, request: &ServiceRequest) -> BoxFuture<'_, DomainResult<ServiceRequest>> {
        let request = request.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let updated_at = to_rfc3339(request.updated_at_ms)?;
            client
                .query(
                    "UPDATE service_request SET \
                        title = $title, \
                        description = $description, \
                        skills_needed = $skills_needed, \
                        status = $status, \
                        negotiation_notes = $negotiation_notes, \
                        updated_at = <datetime>$updated_at \
                     WHERE request_id = $request_id;",
                )
                .bind(("request_id", request.request_id.clone()))
                .bind(("title", request.title.clone()))
                .bind(("description", request.description.clone()))
                .bind(("skills_needed", request.skills_needed.clone()))
                .bind(("status", request.status))
                .bind(("negotiation_notes", request.negotiation_notes.clone()))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;

            Self::fetch_one(&client, request.request_id.clone())
                .await?
                .ok_or(DomainError::NotFound)
        })
    }

    fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> BoxFuture<'_, DomainResult<Vec<ServiceRequest>>> {
        let client = self.client.clone();
        Box::pin(async move {
            let query = format!(
                "{REQUEST_SELECT} WHERE status = $status ORDER BY created_at DESC"
            );
            let mut response = client
                .query(query)
                .bind(("status", status))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response)?;
            decode_request_rows(rows)
        })
    }
}

const AGREEMENT_SELECT: &str = "SELECT agreement_id, request_id, parties, terms, status, \
        <string>created_at AS created_at, <string>updated_at AS updated_at \
 FROM agreement";

#[derive(Debug, Serialize, Deserialize)]
struct SurrealAgreementRow {
    agreement_id: String,
    request_id: String,
    parties: [String; 2],
    terms: String,
    status: AgreementStatus,
    created_at: String,
    updated_at: String,
}

impl SurrealAgreementRow {
    fn into_agreement(self) -> DomainResult<Agreement> {
        Ok(Agreement {
            agreement_id: self.agreement_id,
            request_id: self.request_id,
            parties: self.parties,
            terms: self.terms,
            status: self.status,
            created_at_ms: parse_rfc3339(&self.created_at)?,
            updated_at_ms: parse_rfc3339(&self.updated_at)?,
        })
    }
}

fn decode_agreement_rows(rows: Vec<Value>) -> DomainResult<Vec<Agreement>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value::<SurrealAgreementRow>(row)
                .map_err(|err| DomainError::Upstream(format!("invalid agreement row: {err}")))
                .and_then(SurrealAgreementRow::into_agreement)
        })
        .collect()
}

pub struct SurrealAgreementRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealAgreementRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }

    async fn fetch_one(
        client: &Surreal<Client>,
        agreement_id: String,
    ) -> DomainResult<Option<Agreement>> {
        let query = format!("{AGREEMENT_SELECT} WHERE agreement_id = $agreement_id LIMIT 1");
        let mut response = client
            .query(query)
            .bind(("agreement_id", agreement_id))
            .await
            .map_err(map_surreal_error)?;
        let rows = take_rows(&mut response)?;
        Ok(decode_agreement_rows(rows)?.pop())
    }
}

impl AgreementRepository for SurrealAgreementRepository {
    fn create(&self, agreement: &Agreement) -> BoxFuture<'_, DomainResult<Agreement>> {
        let agreement = agreement.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let created_at = to_rfc3339(agreement.created_at_ms)?;
            let updated_at = to_rfc3339(agreement.updated_at_ms)?;
            client
                .query(
                    "CREATE agreement SET \
                        agreement_id = $agreement_id, \
                        request_id = $request_id, \
                        parties = $parties, \
                        terms = $terms, \
                        status = $status, \
                        created_at = <datetime>$created_at, \
                        updated_at = <datetime>$updated_at;",
                )
                .bind(("agreement_id", agreement.agreement_id.clone()))
                .bind(("request_id", agreement.request_id.clone()))
                .bind(("parties", agreement.parties.to_vec()))
                .bind(("terms", agreement.terms.clone()))
                .bind(("status", agreement.status))
                .bind(("created_at", created_at))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;

            Self::fetch_one(&client, agreement.agreement_id.clone())
                .await?
                .ok_or_else(|| DomainError::Validation("create returned no row".to_string()))
        })
    }

    fn get(&self, agreement_id: &str) -> BoxFuture<'_, DomainResult<Option<Agreement>>> {
        let agreement_id = agreement_id.to_string();
        let client = self.client.clone();
        Box::pin(async move { Self::fetch_one(&client, agreement_id).await })
    }

    fn update(&self, agreement: &Agreement) -> BoxFuture<'_, DomainResult<Agreement>> {
        let agreement = agreement.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let updated_at = to_rfc3339(agreement.updated_at_ms)?;
            client
                .query(
                    "UPDATE agreement SET \
                        terms = $terms, \
                        status = $status, \
                        updated_at = <datetime>$updated_at \
                     WHERE agreement_id = $agreement_id;",
                )
                .bind(("agreement_id", agreement.agreement_id.clone()))
                .bind(("terms", agreement.terms.clone()))
                .bind(("status", agreement.status))
                .bind(("updated_at", updated_at))
                .await
                .map_err(map_surreal_error)?;

            Self::fetch_one(&client, agreement.agreement_id.clone())
                .await?
                .ok_or(DomainError::NotFound)
        })
    }

    fn list_by_request(&self, request_id: &str) -> BoxFuture<'_, DomainResult<Vec<Agreement>>> {
        let request_id = request_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let query = format!(
                "{AGREEMENT_SELECT} WHERE request_id = $request_id ORDER BY created_at ASC"
            );
            let mut response = client
                .query(query)
                .bind(("request_id", request_id))
                .await
                .map_err(map_surreal_error)?;
            let rows = take_rows(&mut response)?;
            decode_agreement_rows(rows)
        })
    }
}

const MESSAGE_SELECT: &str = "SELECT message_id, request_id, sender_id, sender_name, content, \
        <string>created_at AS created_at \
 FROM chat_message";

#[derive(Debug, Deserialize)]
struct SurrealMessageRow {
    message_id: String,
    request_id: String,
    sender_id: String,
    sender_name: String,
    content: String,
    created_at: String,
}

impl SurrealMessageRow {
    fn into_message(self) -> DomainResult<ChatMessage> {
        Ok(ChatMessage {
            message_id: self.message_id,
            request_id: self.request_id,
            sender_id: self.sender_id,
            sender_name: self.sender_name,
            content: self.content,
            created_at_ms: parse_rfc3339(&self.created_at)?,
        })
    }
}

pub struct SurrealChatMessageRepository {
    client: Arc<Surreal<Client>>,
}

impl SurrealChatMessageRepository {
    pub fn with_client(client: Arc<Surreal<Client>>) -> Self {
        Self { client }
    }
}

impl ChatMessageRepository for SurrealChatMessageRepository {
    fn append(&self, message: &ChatMessage) -> BoxFuture<'_, DomainResult<ChatMessage>> {
        let message = message.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let created_at = to_rfc3339(message.created_at_ms)?;
            client
                .query(
                    "CREATE chat_message SET \
                        message_id = $message_id, \
                        request_id = $request_id, \
                        sender_id = $sender_id, \
                        sender_name = $sender_name, \
                        content = $content, \
                        created_at = <datetime>$created_at;",
                )
                .bind(("message_id", message.message_id.clone()))
                .bind(("request_id", message.request_id.clone()))
                .bind(("sender_id", message.sender_id.clone()))
                .bind(("sender_name", message.sender_name.clone()))
                .bind(("content", message.content.clone()))
                .bind(("created_at", created_at))
                .await
                .map_err(map_surreal_error)?;
            Ok(message)
        })
    }

    fn list_by_request(
        &self,
        request_id: &str,
        window: &MessageWindow,
    ) -> BoxFuture<'_, DomainResult<Vec<ChatMessage>>> {
        let request_id = request_id.to_string();
        let window = *window;
        let client = self.client.clone();
        Box::pin(async move {
            let mut query = format!("{MESSAGE_SELECT} WHERE request_id = $request_id");
            if window.since_ms.is_some() {
                query.push_str(" AND created_at > <datetime>$since");
            }
            query.push_str(" ORDER BY created_at ASC, message_id ASC LIMIT $limit;");

            let mut pending = client.query(query);
            pending = pending.bind(("request_id", request_id));
            if let Some(since_ms) = window.since_ms {
                pending = pending.bind(("since", to_rfc3339(since_ms)?));
            }
            pending = pending.bind(("limit", window.limit as i64));
            let mut response = pending.await.map_err(map_surreal_error)?;
            let rows = take_rows(&mut response)?;
            rows.into_iter()
                .map(|row| {
                    serde_json::from_value::<SurrealMessageRow>(row)
                        .map_err(|err| {
                            DomainError::Upstream(format!("invalid message row: {err}"))
                        })
                        .and_then(SurrealMessageRow::into_message)
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_round_trip_keeps_millisecond_precision() {
        let ms = 1_723_822_567_123_i64;
        let encoded = to_rfc3339(ms).expect("encode");
        assert_eq!(parse_rfc3339(&encoded).expect("decode"), ms);
    }

    #[test]
    fn surreal_error_classification() {
        // The mapping is textual; exercise the fallback path with a fake.
        assert!(matches!(
            map_surreal_error(surrealdb::Error::Api(surrealdb::error::Api::Query(
                "index email already exists".to_string()
            ))),
            DomainError::Conflict
        ));
        // A failed query is the store's problem; it must not surface as a
        // client error.
        assert!(matches!(
            map_surreal_error(surrealdb::Error::Api(surrealdb::error::Api::Query(
                "parse error".to_string()
            ))),
            DomainError::Upstream(_)
        ));
    }
}
