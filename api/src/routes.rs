use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use noor_lib::fetcher::{ChapterEnvelope, ChapterPayload, CommentaryEnvelope, CommentaryPayload};
use noor_lib::catalog::{filter_by_topic, search_groups};
use noor_lib::{
    search_chapters, AdhkarCatalog, ChapterCoordinator, ChapterEntry, ChapterNumber, Collection,
    CommentarySource, FetchFailure, NoorError, RawChapter, RawVerse, TextGroup, Topic,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

const CHAPTER_CACHE_CONTROL: &str = "public, s-maxage=86400, stale-while-revalidate=604800";
const ADHKAR_CACHE_CONTROL: &str = "public, s-maxage=3600, stale-while-revalidate=86400";
const COMMENTARY_SOURCE: &str = "quran.com";

pub struct ApiState {
    pub chapters: ChapterCoordinator,
    pub commentary: Arc<dyn CommentarySource>,
    pub commentary_timeout: Duration,
    pub catalog: AdhkarCatalog,
}

// === Response types ===

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    cached_chapters: usize,
    pending_fetches: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub success: bool,
    pub data: Vec<TextGroup>,
    pub count: usize,
    pub total_items: usize,
}

impl CollectionResponse {
    fn ok(data: Vec<TextGroup>) -> Self {
        Self {
            success: true,
            count: data.len(),
            total_items: noor_lib::content::total_items(&data),
            data,
        }
    }

    fn failed() -> Self {
        Self {
            success: false,
            data: Vec::new(),
            count: 0,
            total_items: 0,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct ChapterSearchResponse {
    pub success: bool,
    pub data: Vec<ChapterEntryBody>,
    pub count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ChapterEntryBody {
    pub id: u16,
    pub name: String,
}

impl From<ChapterEntry> for ChapterEntryBody {
    fn from(entry: ChapterEntry) -> Self {
        Self {
            id: entry.id.get(),
            name: entry.name.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct CollectionQuery {
    q: Option<String>,
    topic: Option<String>,
}

#[derive(Deserialize)]
struct ChapterSearchQuery {
    q: Option<String>,
}

#[derive(Deserialize)]
struct CommentaryQuery {
    surah: Option<String>,
    ayah: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            message: message.into(),
        }),
    )
}

// === Handlers ===

async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let (cached_chapters, pending_fetches) = state.chapters.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        cached_chapters,
        pending_fetches,
    })
}

fn chapter_error(error: &NoorError) -> ApiError {
    match error {
        NoorError::FetchFailed(FetchFailure::Timeout) => api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "انتهت مهلة الاتصال، يرجى المحاولة مرة أخرى",
        ),
        NoorError::FetchFailed(FetchFailure::Http { status: 404, .. }) => {
            api_error(StatusCode::NOT_FOUND, "السورة غير موجودة")
        }
        _ => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "حدث خطأ في الخادم، يرجى المحاولة لاحقاً",
        ),
    }
}

async fn get_chapter(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let number = id
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|n| ChapterNumber::new(n).ok())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "رقم السورة يجب أن يكون بين 1 و114"))?;

    let chapter = state.chapters.get_chapter(number).await.map_err(|e| {
        tracing::error!(chapter = %number, error = %e, "chapter request failed");
        chapter_error(&e)
    })?;

    let raw = RawChapter {
        number: chapter.number.get(),
        name: chapter.name.clone(),
        verses: Some(
            chapter
                .verses
                .iter()
                .map(|v| RawVerse {
                    number_in_chapter: v.number_in_chapter,
                    text: Some(v.text.clone()),
                })
                .collect(),
        ),
    };
    let envelope = ChapterEnvelope {
        code: 200,
        message: None,
        data: Some(ChapterPayload::from(raw)),
    };
    Ok(([(header::CACHE_CONTROL, CHAPTER_CACHE_CONTROL)], Json(envelope)))
}

async fn get_commentary(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<CommentaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(surah), Some(ayah)) = (params.surah, params.ayah) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Missing required parameters: surah and ayah",
        ));
    };

    let chapter = surah.trim().parse::<i64>().ok().and_then(|n| ChapterNumber::new(n).ok());
    let verse = ayah.trim().parse::<u32>().ok().filter(|v| *v >= 1);
    let (Some(chapter), Some(verse)) = (chapter, verse) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid surah or ayah number"));
    };

    let fetch = state.commentary.fetch_commentary(chapter, verse);
    let result = match tokio::time::timeout(state.commentary_timeout, fetch).await {
        Ok(result) => result,
        Err(_) => Err(NoorError::timeout()),
    };

    match result {
        Ok(Some(tafsir)) => {
            let envelope = CommentaryEnvelope {
                code: 200,
                message: None,
                data: Some(CommentaryPayload {
                    surah: chapter.get(),
                    ayah: verse,
                    tafsir,
                    source: COMMENTARY_SOURCE.to_string(),
                }),
            };
            Ok(([(header::CACHE_CONTROL, CHAPTER_CACHE_CONTROL)], Json(envelope)))
        }
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "التفسير غير متوفر لهذه الآية")),
        Err(e) => {
            tracing::error!(chapter = %chapter, verse, error = %e, "commentary request failed");
            Err(match e {
                NoorError::FetchFailed(FetchFailure::Timeout) => {
                    api_error(StatusCode::SERVICE_UNAVAILABLE, "انتهت مهلة الاتصال بخدمة التفسير")
                }
                NoorError::FetchFailed(FetchFailure::Network(_)) => {
                    api_error(StatusCode::SERVICE_UNAVAILABLE, "خطأ في الاتصال بخدمة التفسير")
                }
                _ => api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "حدث خطأ داخلي أثناء جلب التفسير",
                ),
            })
        }
    }
}

type CollectionReply = (StatusCode, [(header::HeaderName, &'static str); 1], Json<CollectionResponse>);

fn collection_failure(status: StatusCode) -> CollectionReply {
    (
        status,
        [(header::CACHE_CONTROL, "no-store")],
        Json(CollectionResponse::failed()),
    )
}

/// Published collection, narrowed by the optional `topic` and `q` parameters.
fn collection_response(state: &ApiState, collection: Collection, query: CollectionQuery) -> CollectionReply {
    let topic = match query.topic.as_deref().map(str::trim).filter(|t| !t.is_empty() && *t != "all") {
        Some(raw) => match raw.parse::<Topic>() {
            Ok(topic) => Some(topic),
            Err(_) => return collection_failure(StatusCode::BAD_REQUEST),
        },
        None => None,
    };

    match state.catalog.collection(collection) {
        Ok(mut groups) => {
            if let Some(topic) = topic {
                groups = filter_by_topic(groups, topic);
            }
            if let Some(q) = query.q.as_deref() {
                groups = search_groups(groups, q);
            }
            (
                StatusCode::OK,
                [(header::CACHE_CONTROL, ADHKAR_CACHE_CONTROL)],
                Json(CollectionResponse::ok(groups)),
            )
        }
        Err(e) => {
            tracing::error!(?collection, error = %e, "collection request failed");
            collection_failure(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// One group of a collection, looked up by its label.
fn group_response(state: &ApiState, collection: Collection, category: &str) -> CollectionReply {
    match state.catalog.find(collection, category) {
        Ok(Some(group)) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, ADHKAR_CACHE_CONTROL)],
            Json(CollectionResponse::ok(vec![group])),
        ),
        Ok(None) => collection_failure(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(?collection, category, error = %e, "group request failed");
            collection_failure(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Remembrance collections only; supplications are served under `/duas`.
fn remembrance_collection(name: &str) -> Option<Collection> {
    match name.parse::<Collection>() {
        Ok(collection @ (Collection::Morning | Collection::Evening | Collection::General)) => Some(collection),
        _ => None,
    }
}

async fn get_adhkar(
    State(state): State<Arc<ApiState>>,
    Path(name): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    match remembrance_collection(&name) {
        Some(collection) => collection_response(&state, collection, query),
        None => collection_failure(StatusCode::NOT_FOUND),
    }
}

async fn get_adhkar_group(
    State(state): State<Arc<ApiState>>,
    Path((name, category)): Path<(String, String)>,
) -> impl IntoResponse {
    match remembrance_collection(&name) {
        Some(collection) => group_response(&state, collection, &category),
        None => collection_failure(StatusCode::NOT_FOUND),
    }
}

async fn get_duas(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    collection_response(&state, Collection::Supplications, query)
}

async fn get_dua_group(
    State(state): State<Arc<ApiState>>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    group_response(&state, Collection::Supplications, &category)
}

async fn get_surahs(Query(query): Query<ChapterSearchQuery>) -> Json<ChapterSearchResponse> {
    let data: Vec<ChapterEntryBody> = search_chapters(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(ChapterEntryBody::from)
        .collect();
    Json(ChapterSearchResponse {
        success: true,
        count: data.len(),
        data,
    })
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/quran/:id", get(get_chapter))
        .route("/tafsir", get(get_commentary))
        .route("/surahs", get(get_surahs))
        .route("/adhkar/:collection", get(get_adhkar))
        .route("/adhkar/:collection/:category", get(get_adhkar_group))
        .route("/duas", get(get_duas))
        .route("/duas/:category", get(get_dua_group))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use noor_lib::{ChapterSource, ClassificationRules};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct StubSource {
        calls: AtomicUsize,
    }

    impl ChapterSource for StubSource {
        fn fetch_chapter(&self, number: ChapterNumber) -> BoxFuture<'_, Result<RawChapter, NoorError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match number.get() {
                    113 => Err(NoorError::timeout()),
                    114 => Err(NoorError::http(500, None)),
                    n => Ok(RawChapter {
                        number: n,
                        name: "الفاتحة".to_string(),
                        verses: Some(vec![
                            RawVerse { number_in_chapter: 1, text: Some("بِسْمِ اللَّهِ".into()) },
                            RawVerse { number_in_chapter: 2, text: Some("الْحَمْدُ لِلَّهِ".into()) },
                        ]),
                    }),
                }
            }
            .boxed()
        }
    }

    impl CommentarySource for StubSource {
        fn fetch_commentary(
            &self,
            _chapter: ChapterNumber,
            verse: u32,
        ) -> BoxFuture<'_, Result<Option<String>, NoorError>> {
            async move {
                match verse {
                    1 => Ok(Some("تفسير".to_string())),
                    2 => Ok(None),
                    3 => Err(NoorError::network("refused")),
                    _ => Err(NoorError::http(500, None)),
                }
            }
            .boxed()
        }
    }

    fn setup() -> (TestServer, Arc<StubSource>) {
        let source = Arc::new(StubSource::default());
        let state = Arc::new(ApiState {
            chapters: ChapterCoordinator::new(source.clone(), Duration::from_secs(6)),
            commentary: source.clone(),
            commentary_timeout: Duration::from_secs(8),
            catalog: AdhkarCatalog::embedded(ClassificationRules::default()),
        });
        let server = TestServer::new(create_router(state)).unwrap();
        (server, source)
    }

    #[tokio::test]
    async fn test_chapter_envelope() {
        let (server, source) = setup();
        let response = server.get("/quran/1").await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"]["number"], 1);
        assert_eq!(body["data"]["ayahs"][1]["numberInSurah"], 2);

        server.get("/quran/1").await.assert_status_ok();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chapter_errors() {
        let (server, source) = setup();
        for path in ["/quran/0", "/quran/115", "/quran/abc"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert_eq!(response.json::<ErrorResponse>().code, 400);
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        server.get("/quran/113").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        let failed = server.get("/quran/114").await;
        failed.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failed.json::<ErrorResponse>().message, "حدث خطأ في الخادم، يرجى المحاولة لاحقاً");
    }

    #[tokio::test]
    async fn test_commentary() {
        let (server, _) = setup();

        let response = server.get("/tafsir?surah=1&ayah=1").await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["data"]["tafsir"], "تفسير");
        assert_eq!(body["data"]["source"], "quran.com");

        server.get("/tafsir?surah=1").await.assert_status(StatusCode::BAD_REQUEST);
        server.get("/tafsir?surah=0&ayah=1").await.assert_status(StatusCode::BAD_REQUEST);
        server.get("/tafsir?surah=1&ayah=0").await.assert_status(StatusCode::BAD_REQUEST);
        server.get("/tafsir?surah=1&ayah=2").await.assert_status(StatusCode::NOT_FOUND);
        server.get("/tafsir?surah=1&ayah=3").await.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        server.get("/tafsir?surah=1&ayah=4").await.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_collections() {
        let (server, _) = setup();

        let morning: CollectionResponse = server.get("/adhkar/morning").await.json();
        assert!(morning.success);
        assert_eq!(morning.count, 1);
        assert_eq!(morning.total_items, 5);

        let duas = server.get("/duas").await;
        duas.assert_status_ok();
        let duas: CollectionResponse = duas.json();
        assert_eq!(duas.count, duas.data.len());
        assert!(duas.data.iter().any(|g| g.id == 1019));

        let unknown = server.get("/adhkar/night").await;
        unknown.assert_status(StatusCode::NOT_FOUND);
        assert!(!unknown.json::<CollectionResponse>().success);
        // supplications are served from /duas only
        server.get("/adhkar/duas").await.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_collection_topic_and_search() {
        let (server, _) = setup();

        let prophets: CollectionResponse = server.get("/duas").add_query_param("topic", "prophets").await.json();
        assert_eq!(prophets.count, 9);

        let all: CollectionResponse = server.get("/duas").add_query_param("topic", "all").await.json();
        let plain: CollectionResponse = server.get("/duas").await.json();
        assert_eq!(all.count, plain.count);

        let searched: CollectionResponse = server
            .get("/duas")
            .add_query_param("topic", "prophets")
            .add_query_param("q", "يونس")
            .await
            .json();
        assert_eq!(searched.count, 1);
        assert_eq!(searched.data[0].category, "دعاء يونس عليه السلام");

        let bad = server.get("/duas").add_query_param("topic", "travel").await;
        bad.assert_status(StatusCode::BAD_REQUEST);
        assert!(!bad.json::<CollectionResponse>().success);
    }

    fn encoded(label: &str) -> String {
        label
            .bytes()
            .map(|b| {
                if b.is_ascii_alphanumeric() {
                    (b as char).to_string()
                } else {
                    format!("%{:02X}", b)
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_group_lookup() {
        let (server, _) = setup();

        let found = server.get(&format!("/duas/{}", encoded("دعاء الفرج"))).await;
        found.assert_status_ok();
        let found: CollectionResponse = found.json();
        assert_eq!(found.count, 1);
        assert_eq!(found.data[0].id, 1004);

        server
            .get(&format!("/duas/{}", encoded("دعاء مجهول")))
            .await
            .assert_status(StatusCode::NOT_FOUND);
        server
            .get(&format!("/adhkar/general/{}", encoded("التهليل")))
            .await
            .assert_status_ok();
        server
            .get(&format!("/adhkar/duas/{}", encoded("دعاء الفرج")))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_surah_name_search() {
        let (server, _) = setup();

        let body: ChapterSearchResponse = server.get("/surahs").add_query_param("q", "الكهف").await.json();
        assert!(body.success);
        assert_eq!(body.count, 1);
        assert_eq!(body.data[0].id, 18);

        let empty: ChapterSearchResponse = server.get("/surahs").await.json();
        assert_eq!(empty.count, 0);
    }

    #[tokio::test]
    async fn test_health_reports_cache() {
        let (server, _) = setup();
        server.get("/quran/2").await.assert_status_ok();
        let body: serde_json::Value = server.get("/health").await.json();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cached_chapters"], 1);
    }
}
