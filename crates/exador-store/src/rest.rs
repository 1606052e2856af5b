//! REST backend speaking the hosted database's row API.
//!
//! Tables live under `/rest/v1/<table>` with filters passed as query
//! parameters (`id=eq.<uuid>`); the signed-in user comes from
//! `/auth/v1/user`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use exador_core::error::StoreError;
use exador_core::model::{
    Chapter, ChapterSummary, Continent, Identity, NewChapter, NewOption, NewQuestion, Profile,
    ProfileProgress, Question, QuizSessionRecord, StudentAnswerRecord,
};
use exador_core::traits::{IdentityProvider, QuizStore};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Store backed by the hosted REST API.
pub struct RestStore {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl std::fmt::Debug for RestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestStore")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Deserialize)]
struct IdRow {
    id: Uuid,
}

#[derive(Deserialize)]
struct CountRow {
    count: usize,
}

#[derive(Deserialize)]
struct ChapterRow {
    #[serde(flatten)]
    chapter: Chapter,
    #[serde(default)]
    questions: Vec<CountRow>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Serialize)]
struct ProfileUpdate<'a> {
    #[serde(flatten)]
    progress: &'a ProfileProgress,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, access_token: Option<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token,
            client,
        })
    }

    fn table_url(&self, table: &str, params: &[(&str, String)]) -> anyhow::Result<Url> {
        let url = Url::parse_with_params(&format!("{}/rest/v1/{table}", self.base_url), params)?;
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
    }

    async fn send(&self, builder: RequestBuilder) -> anyhow::Result<Response> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                StoreError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status < 400 {
            return Ok(response);
        }

        let path = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Err(match status {
            401 | 403 => StoreError::Unauthorized(message),
            404 => StoreError::NotFound(path),
            _ => StoreError::ApiError { status, message },
        }
        .into())
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> anyhow::Result<Vec<T>> {
        let url = self.table_url(table, params)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        decode(response).await
    }

    /// Insert one row and return the generated id.
    async fn insert_returning_id<B: Serialize + Sync>(
        &self,
        table: &str,
        body: &B,
    ) -> anyhow::Result<Uuid> {
        let url = self.table_url(table, &[("select", "id".to_string())])?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(body),
            )
            .await?;
        let rows: Vec<IdRow> = decode(response).await?;
        rows.first()
            .map(|r| r.id)
            .ok_or_else(|| StoreError::Decode(format!("insert into {table} returned no row")).into())
    }

    async fn insert<B: Serialize + Sync>(&self, table: &str, body: &B) -> anyhow::Result<()> {
        let url = self.table_url(table, &[])?;
        self.send(
            self.request(Method::POST, url)
                .header("Prefer", "return=minimal")
                .json(body),
        )
        .await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> anyhow::Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| StoreError::NetworkError(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()).into())
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl QuizStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    #[instrument(skip(self))]
    async fn fetch_chapter(&self, chapter_id: Uuid) -> anyhow::Result<Option<Chapter>> {
        let rows: Vec<Chapter> = self
            .get_rows(
                "chapters",
                &[("select", "*".into()), ("id", eq(chapter_id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn fetch_questions(&self, chapter_id: Uuid) -> anyhow::Result<Vec<Question>> {
        let mut questions: Vec<Question> = self
            .get_rows(
                "questions",
                &[
                    ("select", "*,options:question_options(*)".into()),
                    ("chapter_id", eq(chapter_id)),
                    ("is_active", eq(true)),
                    ("order", "created_at.asc".into()),
                ],
            )
            .await?;
        for q in &mut questions {
            q.options.sort_by_key(|o| o.order_index);
        }
        tracing::debug!(count = questions.len(), "questions fetched");
        Ok(questions)
    }

    #[instrument(skip(self))]
    async fn list_chapters(&self, continent: Continent) -> anyhow::Result<Vec<ChapterSummary>> {
        let rows: Vec<ChapterRow> = self
            .get_rows(
                "chapters",
                &[
                    ("select", "*,questions(count)".into()),
                    ("continent", eq(continent)),
                    ("is_active", eq(true)),
                    ("questions.is_active", eq(true)),
                    ("order", "order_index.asc".into()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| ChapterSummary {
                question_count: row.questions.first().map_or(0, |c| c.count),
                chapter: row.chapter,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn fetch_profile(&self, user_id: Uuid) -> anyhow::Result<Profile> {
        let rows: Vec<Profile> = self
            .get_rows("profiles", &[("select", "*".into()), ("id", eq(user_id))])
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("profile {user_id}")).into())
    }

    #[instrument(skip(self))]
    async fn list_students(&self) -> anyhow::Result<Vec<Profile>> {
        self.get_rows(
            "profiles",
            &[
                ("select", "*".into()),
                ("role", eq("student")),
                ("order", "created_at.desc".into()),
            ],
        )
        .await
    }

    #[instrument(skip(self, record), fields(student = %record.student_id))]
    async fn insert_session(&self, record: &QuizSessionRecord) -> anyhow::Result<Uuid> {
        self.insert_returning_id("quiz_sessions", record).await
    }

    #[instrument(skip(self, record), fields(question = %record.question_id))]
    async fn insert_answer(&self, record: &StudentAnswerRecord) -> anyhow::Result<()> {
        self.insert("student_answers", record).await
    }

    #[instrument(skip(self, progress))]
    async fn update_profile_progress(
        &self,
        user_id: Uuid,
        progress: &ProfileProgress,
    ) -> anyhow::Result<()> {
        let url = self.table_url("profiles", &[("id", eq(user_id))])?;
        let body = ProfileUpdate {
            progress,
            updated_at: chrono::Utc::now(),
        };
        self.send(
            self.request(Method::PATCH, url)
                .header("Prefer", "return=minimal")
                .json(&body),
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_chapter_by_code(&self, code: &str) -> anyhow::Result<Option<Uuid>> {
        let rows: Vec<IdRow> = self
            .get_rows(
                "chapters",
                &[
                    ("select", "id".into()),
                    ("code", eq(code)),
                    ("limit", "1".into()),
                ],
            )
            .await?;
        Ok(rows.first().map(|r| r.id))
    }

    #[instrument(skip(self, chapter), fields(code = %chapter.code))]
    async fn insert_chapter(&self, chapter: &NewChapter) -> anyhow::Result<Uuid> {
        self.insert_returning_id("chapters", chapter).await
    }

    #[instrument(skip(self, question), fields(chapter = %question.chapter_id))]
    async fn insert_question(&self, question: &NewQuestion) -> anyhow::Result<Uuid> {
        self.insert_returning_id("questions", question).await
    }

    #[instrument(skip(self, option), fields(question = %option.question_id))]
    async fn insert_option(&self, option: &NewOption) -> anyhow::Result<()> {
        self.insert("question_options", option).await
    }
}

#[async_trait]
impl IdentityProvider for RestStore {
    #[instrument(skip(self))]
    async fn current_identity(&self) -> anyhow::Result<Option<Identity>> {
        if self.access_token.is_none() {
            return Ok(None);
        }
        let url = Url::parse(&format!("{}/auth/v1/user", self.base_url))?;
        match self.send(self.request(Method::GET, url)).await {
            Ok(response) => {
                let user: UserResponse = decode(response).await?;
                Ok(Some(Identity {
                    user_id: user.id,
                    email: user.email,
                }))
            }
            Err(e) if matches!(e.downcast_ref::<StoreError>(), Some(StoreError::Unauthorized(_))) => {
                tracing::warn!("access token rejected: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
