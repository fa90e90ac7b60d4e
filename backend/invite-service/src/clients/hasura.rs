/// Hasura GraphQL client
///
/// Admin-secret authenticated queries against the `user` and `user_groups`
/// tables. The backend is authorization-agnostic at this level; callers decide
/// what a role code means.
use super::{Backend, BackendError};
use crate::config::HasuraSettings;
use crate::models::NewUser;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, BackendError>;

const INSERT_USER_ONE: &str = r#"
mutation InsertUserOne($stguid: String!, $name: String!, $email: String!, $ugGuid: String!, $groupID: Int!) {
  insert_user_one(object: {guid: $stguid, name: $name, email: $email, user_groups: {data: {group_id: $groupID, guid: $ugGuid}}}) {
    guid
  }
}
"#;

const USER_BY_EMAIL: &str = r#"
query GetUserByEmail($email: String!) {
  user(where: {email: {_eq: $email}}) {
    guid
  }
}
"#;

const USER_GROUP_ROLE: &str = r#"
query GetUserGroupRole($userGUID: String!, $groupGUID: String!) {
  user(where: {guid: {_eq: $userGUID}}) {
    user_groups(where: {group: {guid: {_eq: $groupGUID}}}) {
      role
    }
  }
}
"#;

const USER_BY_PK: &str = r#"
query GetUser($guid: String!) {
  user_by_pk(guid: $guid) {
    role
  }
}
"#;

#[derive(Clone)]
pub struct HasuraClient {
    http: Client,
    endpoint: String,
    admin_secret: String,
}

impl HasuraClient {
    pub fn new(config: &HasuraSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        info!(endpoint = %config.endpoint, "Hasura client initialized");

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            admin_secret: config.admin_secret.clone(),
        })
    }

    /// Execute a GraphQL document and decode its `data` member
    async fn execute<T: DeserializeOwned>(&self, operation: &str, query: &str, variables: Value) -> Result<T> {
        debug!(operation, "Executing Hasura operation");

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-hasura-admin-secret", &self.admin_secret)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await
            .map_err(|e| BackendError::Transport(format!("{} request failed: {}", operation, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Transport(format!(
                "{} returned HTTP {}: {}",
                operation, status, body
            )));
        }

        let body: GraphQlResponse<T> = response.json().await.map_err(|e| {
            BackendError::Query(format!("Failed to parse {} response: {}", operation, e))
        })?;

        decode_response(operation, body)
    }
}

fn decode_response<T>(operation: &str, body: GraphQlResponse<T>) -> Result<T> {
    if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
        let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(BackendError::Query(format!(
            "{}: {}",
            operation,
            messages.join("; ")
        )));
    }

    body.data
        .ok_or_else(|| BackendError::Query(format!("{}: response without data", operation)))
}

/// At most one row, or `Ambiguous`
fn single<T>(entity: &'static str, mut rows: Vec<T>) -> Result<Option<T>> {
    match rows.len() {
        0 => Ok(None),
        1 => Ok(rows.pop()),
        n => Err(BackendError::Ambiguous { entity, rows: n }),
    }
}

#[async_trait]
impl Backend for HasuraClient {
    async fn create_user(&self, user: &NewUser) -> Result<()> {
        let variables = json!({
            "stguid": user.identity_id,
            "name": user.name,
            "email": user.email,
            "ugGuid": user.membership_link_id,
            "groupID": user.group_id,
        });

        let data: InsertUserOneData = self.execute("InsertUserOne", INSERT_USER_ONE, variables).await?;
        debug!(guid = %data.insert_user_one.guid, "Inserted backend user");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<String>> {
        let data: UsersData<UserGuid> = self
            .execute("GetUserByEmail", USER_BY_EMAIL, json!({ "email": email }))
            .await?;

        Ok(single("user", data.user)?.map(|user| user.guid))
    }

    async fn role_in_group(&self, user_id: &str, group_guid: &str) -> Result<Option<i32>> {
        let data: UsersData<UserWithGroups> = self
            .execute(
                "GetUserGroupRole",
                USER_GROUP_ROLE,
                json!({ "userGUID": user_id, "groupGUID": group_guid }),
            )
            .await?;

        let Some(user) = single("user", data.user)? else {
            return Ok(None);
        };
        Ok(single("user_groups", user.user_groups)?.map(|membership| membership.role))
    }

    async fn role_by_id(&self, user_id: &str) -> Result<Option<i32>> {
        let data: UserByPkData = self
            .execute("GetUser", USER_BY_PK, json!({ "guid": user_id }))
            .await?;

        Ok(data.user_by_pk.map(|user| user.role))
    }
}

// ===== GraphQL Wire Types =====

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct InsertUserOneData {
    insert_user_one: UserGuid,
}

#[derive(Debug, Deserialize)]
struct UsersData<T> {
    user: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct UserGuid {
    guid: String,
}

#[derive(Debug, Deserialize)]
struct UserWithGroups {
    user_groups: Vec<RoleRow>,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: i32,
}

#[derive(Debug, Deserialize)]
struct UserByPkData {
    user_by_pk: Option<RoleRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_errors_surface_as_query_error() {
        let body: GraphQlResponse<UsersData<UserGuid>> = serde_json::from_str(
            r#"{"errors":[{"message":"field 'user' not found"},{"message":"second"}]}"#,
        )
        .unwrap();

        let err = decode_response("GetUserByEmail", body).unwrap_err();
        assert!(matches!(err, BackendError::Query(ref msg) if msg.contains("second")));
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let body: GraphQlResponse<UsersData<UserGuid>> = serde_json::from_str(r#"{}"#).unwrap();
        assert!(decode_response("GetUserByEmail", body).is_err());
    }

    #[test]
    fn test_nested_role_rows_decode() {
        let body: GraphQlResponse<UsersData<UserWithGroups>> = serde_json::from_str(
            r#"{"data":{"user":[{"user_groups":[{"role":2}]}]}}"#,
        )
        .unwrap();

        let data = decode_response("GetUserGroupRole", body).unwrap();
        let user = single("user", data.user).unwrap().unwrap();
        let role = single("user_groups", user.user_groups).unwrap().unwrap();
        assert_eq!(role.role, 2);
    }

    #[test]
    fn test_single_row_cardinality() {
        assert_eq!(single("user", Vec::<i32>::new()).unwrap(), None);
        assert_eq!(single("user", vec![7]).unwrap(), Some(7));
        assert!(matches!(
            single("user", vec![1, 2]),
            Err(BackendError::Ambiguous { entity: "user", rows: 2 })
        ));
    }
}
