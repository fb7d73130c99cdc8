use std::{collections::HashSet, sync::Arc};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value};
use tracing::debug;

use crate::{
    dao::{
        models::{IdKind, MatchEntity, PlayerEntity, TournamentEntity, TournamentListItemEntity},
        storage::{StorageError, StorageResult},
        tournament_store::TournamentStore,
    },
    state::model::{MatchId, PlayerId, TournamentId},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchCounterDocument, CouchMatchDocument, CouchPlayerDocument,
        CouchSettingsDocument, CouchTournamentDocument, END_SUFFIX, MATCH_PREFIX, PLAYER_PREFIX,
        RevisionOnly, SETTINGS_DOC_ID, TOURNAMENT_PREFIX, counter_doc_id, match_doc_id,
        player_doc_id, tournament_doc_id, tournament_matches_prefix,
    },
};

/// Writes attempted per document before a revision conflict is reported.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Run `write` again while CouchDB answers with a revision conflict.
///
/// `Ok(None)` means every attempt conflicted.
async fn retry_on_conflict<T, F, Fut>(doc_id: &str, mut write: F) -> CouchResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CouchResult<T>>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        match write().await {
            Ok(value) => return Ok(Some(value)),
            Err(CouchDaoError::Conflict { .. }) => {
                debug!(doc_id, attempt, "revision conflict; retrying");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

/// [`TournamentStore`] backed by a single CouchDB database.
#[derive(Clone)]
pub struct CouchTournamentStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchTournamentStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        self.authorize(self.client.request(method, url))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseRequest {
                database: database.clone(),
                action: "query",
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .authorize(self.client.put(&url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseRequest {
                        database: database.clone(),
                        action: "create",
                        source,
                    })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn current_rev(&self, doc_id: &str) -> CouchResult<Option<String>> {
        Ok(self
            .get_document::<RevisionOnly>(doc_id)
            .await?
            .map(|doc| doc.rev))
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                path: doc_id.to_string(),
            }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(rev) = self.current_rev(doc_id).await? else {
            return Ok(false);
        };

        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed = from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                    path: row.id.clone(),
                    source,
                })?;
                documents.push(parsed);
            }
        }

        Ok(documents)
    }

    async fn put_match(&self, record: MatchEntity) -> CouchResult<()> {
        let doc_id = match_doc_id(record.tournament_id, record.id);
        let rev = self.current_rev(&doc_id).await?;
        let doc = CouchMatchDocument::from((record, rev));
        self.put_document(&doc_id, &doc).await
    }

    /// Replace a match document under its current revision. `false` when it does not exist.
    async fn replace_match(&self, doc_id: &str, snapshot: &MatchEntity) -> CouchResult<bool> {
        let Some(rev) = self.current_rev(doc_id).await? else {
            return Ok(false);
        };
        let doc = CouchMatchDocument::from((snapshot.clone(), Some(rev)));
        self.put_document(doc_id, &doc).await?;
        Ok(true)
    }

    async fn bump_sequence(&self, doc_id: &str, count: usize) -> CouchResult<i64> {
        let current = self
            .get_document::<CouchCounterDocument>(doc_id)
            .await?
            .unwrap_or(CouchCounterDocument {
                id: doc_id.to_string(),
                rev: None,
                last: 0,
            });
        let first = current.last + 1;
        let next = CouchCounterDocument {
            last: current.last + count as i64,
            ..current
        };
        self.put_document(doc_id, &next).await?;
        Ok(first)
    }

    async fn next_sequence_block(&self, kind: IdKind, count: usize) -> CouchResult<i64> {
        let doc_id = counter_doc_id(kind.as_str());
        let store = self;
        let target = doc_id.as_str();
        retry_on_conflict(target, move || store.bump_sequence(target, count))
            .await?
            .ok_or(CouchDaoError::SequenceContention {
                kind: kind.as_str(),
                attempts: MAX_WRITE_ATTEMPTS,
            })
    }
}

impl TournamentStore for CouchTournamentStore {
    fn load_tournament(
        &self,
        id: TournamentId,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(doc) = store
                .get_document::<CouchTournamentDocument>(&tournament_doc_id(id))
                .await?
            else {
                return Ok(None);
            };
            let match_docs = store
                .list_documents::<CouchMatchDocument>(&tournament_matches_prefix(id))
                .await?;
            Ok(Some(doc.try_into_entity(match_docs)?))
        })
    }

    fn list_tournaments(&self) -> BoxFuture<'static, StorageResult<Vec<TournamentListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let docs = store
                .list_documents::<CouchTournamentDocument>(TOURNAMENT_PREFIX)
                .await?;
            let completed: HashSet<(TournamentId, MatchId)> = store
                .list_documents::<CouchMatchDocument>(MATCH_PREFIX)
                .await?
                .into_iter()
                .filter(|doc| doc.record.completed)
                .map(|doc| (doc.record.tournament_id, doc.record.id))
                .collect();

            let mut items: Vec<TournamentListItemEntity> = docs
                .into_iter()
                .map(|doc| {
                    let body = doc.tournament;
                    TournamentListItemEntity {
                        id: body.tournament_id,
                        name: body.name,
                        kind: body.kind,
                        is_locked: body.is_locked,
                        created_at: body.created_at,
                        player_count: body.player_ids.len(),
                        completed_matches: body
                            .match_ids
                            .iter()
                            .filter(|id| completed.contains(&(body.tournament_id, **id)))
                            .count(),
                        total_matches: body.match_ids.len(),
                    }
                })
                .collect();
            items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            Ok(items)
        })
    }

    fn save_tournament(&self, tournament: TournamentEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            // Match rows first so the tournament never lists a match that does not exist yet.
            for record in tournament.matches.iter().cloned() {
                store.put_match(record).await?;
            }
            let doc_id = tournament_doc_id(tournament.id);
            let rev = store.current_rev(&doc_id).await?;
            let doc = CouchTournamentDocument::from((&tournament, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn delete_tournament(&self, id: TournamentId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let match_docs = store
                .list_documents::<CouchMatchDocument>(&tournament_matches_prefix(id))
                .await?;
            for doc in match_docs {
                store.delete_document(&doc.id).await?;
            }
            Ok(store.delete_document(&tournament_doc_id(id)).await?)
        })
    }

    fn save_match(
        &self,
        match_id: MatchId,
        snapshot: MatchEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = match_doc_id(snapshot.tournament_id, match_id);
            let saved = {
                let (store, target, snapshot) = (&store, doc_id.as_str(), &snapshot);
                retry_on_conflict(target, move || store.replace_match(target, snapshot)).await?
            };
            match saved {
                Some(true) => Ok(()),
                Some(false) => Err(StorageError::Missing(format!("match {match_id}"))),
                None => Err(CouchDaoError::Conflict { path: doc_id }.into()),
            }
        })
    }

    fn list_players(&self) -> BoxFuture<'static, StorageResult<Vec<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut players: Vec<PlayerEntity> = store
                .list_documents::<CouchPlayerDocument>(PLAYER_PREFIX)
                .await?
                .into_iter()
                .map(|doc| doc.player)
                .collect();
            players.sort_by_key(|player| player.id);
            Ok(players)
        })
    }

    fn save_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = player_doc_id(player.id);
            let rev = store.current_rev(&doc_id).await?;
            let doc = CouchPlayerDocument::from((player, rev));
            store.put_document(&doc_id, &doc).await.map_err(Into::into)
        })
    }

    fn delete_player(&self, id: PlayerId) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.delete_document(&player_doc_id(id)).await?) })
    }

    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Vec<(String, Value)>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store
                .get_document::<CouchSettingsDocument>(SETTINGS_DOC_ID)
                .await?
                .unwrap_or_default();
            Ok(doc.values.into_iter().collect())
        })
    }

    fn save_settings(&self, key: String, value: Value) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut doc = store
                .get_document::<CouchSettingsDocument>(SETTINGS_DOC_ID)
                .await?
                .unwrap_or_default();
            doc.id = SETTINGS_DOC_ID.to_string();
            doc.values.insert(key, value);
            store
                .put_document(SETTINGS_DOC_ID, &doc)
                .await
                .map_err(Into::into)
        })
    }

    fn allocate_ids(&self, kind: IdKind, count: usize) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.next_sequence_block(kind, count).await?) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let response = store
                .authorize(store.client.get(&url))
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
