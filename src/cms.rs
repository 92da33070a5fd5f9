//! CMS client resolving a token holder into the subject of their credential.

// crates.io
use reqwest::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::{Introspection, TokenSecret},
	error::{ConfigError, RecordError},
	http::{self, ReqwestHttpClient, Service},
};

/// Credential subject: the single CMS record describing the holder.
pub type Subject = Map<String, Value>;

/// CMS user row; every member is optional on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsUser {
	/// Numeric row identifier.
	pub id: Option<u64>,
	/// Stable user identifier used to key scope records.
	pub userid: String,
	/// Display name; the CMS may leave it null.
	pub name: Option<String>,
	/// Email address; the token subject is matched against it.
	pub email: Option<String>,
}

/// Reads users and scope records from the CMS.
#[derive(Clone, Debug)]
pub struct CmsClient {
	base: Url,
	http_client: ReqwestHttpClient,
}
impl CmsClient {
	/// Creates a client rooted at `base`.
	pub fn new(base: Url, http_client: ReqwestHttpClient) -> Result<Self, ConfigError> {
		http::validate_service_url(Service::Cms, &base)?;

		Ok(Self { base, http_client })
	}

	/// Fetches the record for the credential scope granted to the token holder.
	///
	/// The user is found by matching `introspection.subject` against the CMS email column, and
	/// the record is then looked up in the collection named after the scope.
	pub async fn fetch_subject(
		&self,
		token: &TokenSecret,
		introspection: &Introspection,
	) -> Result<Subject> {
		let scope = introspection.credential_scope()?;
		let user = self.fetch_user(token, &introspection.subject).await?;
		let collection = format!("{}s", scope.to_lowercase());
		let mut url = http::endpoint(&self.base, &[&collection]);

		url.query_pairs_mut().append_pair("userid", &user.userid);

		let body = self.get(token, url).await?;

		unmarshal_subject(&body)
	}

	async fn fetch_user(&self, token: &TokenSecret, email: &str) -> Result<CmsUser> {
		let mut url = http::endpoint(&self.base, &["users"]);

		url.query_pairs_mut().append_pair("email", email);

		let body = self.get(token, url).await?;

		unmarshal_user(&body)
	}

	async fn get(&self, token: &TokenSecret, url: Url) -> Result<Vec<u8>> {
		tracing::debug!(%url, "Querying the CMS.");

		let request =
			self.http_client.get(url).header(AUTHORIZATION, format!("Bearer {}", token.expose()));

		self.http_client.send(Service::Cms, request, StatusCode::OK).await
	}
}

/// Decodes a users query result that must contain exactly one user.
pub fn unmarshal_user(body: &[u8]) -> Result<CmsUser> {
	let users: Vec<CmsUser> = http::decode_json(Service::Cms, body)?;

	exactly_one(users, RecordError::UserNotFound, RecordError::MultipleUsers)
}

/// Decodes a scope query result that must contain exactly one record.
pub fn unmarshal_subject(body: &[u8]) -> Result<Subject> {
	let records: Vec<Subject> = http::decode_json(Service::Cms, body)?;

	exactly_one(records, RecordError::RecordNotFound, RecordError::MultipleRecords)
}

fn exactly_one<T>(mut rows: Vec<T>, none: RecordError, many: RecordError) -> Result<T> {
	match rows.len() {
		0 => Err(none.into()),
		1 => Ok(rows.remove(0)),
		_ => Err(many.into()),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use httpmock::prelude::*;
	use serde_json::json;
	// self
	use super::*;

	const USER: &str = r#"[{"id":1,"userid":"100","name":"Foo Bar","email":"foo@bar.com"}]"#;

	fn introspection(scope: &str) -> Introspection {
		Introspection {
			active: true,
			subject: "foo@bar.com".into(),
			scope: scope.into(),
			..Default::default()
		}
	}

	fn client(server: &MockServer) -> CmsClient {
		CmsClient::new(
			Url::parse(&server.base_url()).expect("Mock server URL should parse."),
			ReqwestHttpClient::default(),
		)
		.expect("Mock server URL should be a valid CMS base.")
	}

	#[test]
	fn unmarshal_user_requires_exactly_one_row() {
		let user = unmarshal_user(USER.as_bytes()).expect("A single user should decode.");

		assert_eq!(user.userid, "100");
		assert_eq!(user.email.as_deref(), Some("foo@bar.com"));

		let err = unmarshal_user(b"[]").expect_err("An empty result should fail.");

		assert_eq!(err.to_string(), "User not found.");

		let err = unmarshal_user(br#"[{"userid":"1"},{"userid":"2"}]"#)
			.expect_err("Two users should fail.");

		assert_eq!(err.to_string(), "Multiple users found.");
	}

	#[test]
	fn unmarshal_user_tolerates_null_display_fields() {
		let user = unmarshal_user(br#"[{"id":1,"userid":"100","name":null,"email":null}]"#)
			.expect("Null display fields should decode.");

		assert_eq!(user.userid, "100");
		assert_eq!(user.name, None);
		assert_eq!(user.email, None);
	}

	#[test]
	fn unmarshal_subject_requires_exactly_one_record() {
		let subject = unmarshal_subject(br#"[{"name":"Foo","university":"MIT"}]"#)
			.expect("A single record should decode.");

		assert_eq!(subject.get("university"), Some(&json!("MIT")));
		assert_eq!(
			unmarshal_subject(b"[]").expect_err("No records should fail.").to_string(),
			"Record not found."
		);
		assert_eq!(
			unmarshal_subject(b"[{},{}]").expect_err("Two records should fail.").to_string(),
			"Multiple records found."
		);
	}

	#[test]
	fn unmarshal_reports_malformed_json() {
		let err = unmarshal_user(b"{").expect_err("Truncated JSON should fail.");

		assert!(matches!(err, Error::Downstream(_)));
		assert!(unmarshal_subject(br#"["record"]"#).is_err());
	}

	#[tokio::test]
	async fn fetch_subject_queries_users_then_scope_collection() {
		let server = MockServer::start_async().await;
		let users = server
			.mock_async(|when, then| {
				when.method(GET)
					.path("/users")
					.query_param("email", "foo@bar.com")
					.header("authorization", "Bearer access");
				then.status(200).body(USER);
			})
			.await;
		let records = server
			.mock_async(|when, then| {
				when.method(GET).path("/studentcards").query_param("userid", "100");
				then.status(200).body(r#"[{"name":"Foo Bar","semester":"Fall"}]"#);
			})
			.await;
		let subject = client(&server)
			.fetch_subject(&TokenSecret::new("access"), &introspection("openid StudentCard"))
			.await
			.expect("The CMS lookup should succeed.");

		users.assert_async().await;
		records.assert_async().await;

		assert_eq!(subject.get("semester"), Some(&json!("Fall")));
	}

	#[tokio::test]
	async fn fetch_subject_surfaces_cms_status_failures() {
		let server = MockServer::start_async().await;

		server
			.mock_async(|when, then| {
				when.method(GET).path("/users");
				then.status(500).body("boom");
			})
			.await;

		let err = client(&server)
			.fetch_subject(&TokenSecret::new("access"), &introspection("StudentCard"))
			.await
			.expect_err("A 500 from the CMS should fail.");

		assert!(err.to_string().contains("500 Internal Server Error"), "{err}");
	}

	#[tokio::test]
	async fn fetch_subject_needs_a_credential_scope() {
		let server = MockServer::start_async().await;
		let err = client(&server)
			.fetch_subject(&TokenSecret::new("access"), &introspection("openid"))
			.await
			.expect_err("Standard scopes alone should fail.");

		assert!(matches!(err, Error::MissingCredentialScope));
	}
}
