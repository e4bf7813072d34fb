//! Paginated Super Search.
//!
//! The service returns at most [`MAX_PAGE`] hits per request. A [`Paginator`]
//! walks the pages of one query, asking each time only for as many hits as
//! are both still wanted and still available.

use std::pin::Pin;

use futures::Stream;
use serde_json::{Map, Value};
use tracing::debug;

use crate::client::{Transport, SUPERSEARCH_ENDPOINT};
use crate::error::{Error, Result};
use crate::limit::Limit;
use crate::params::{SearchParams, COLUMNS, DATE, MAX_PAGE, RESULTS_NUMBER, RESULTS_OFFSET, SORT};
use crate::table::{FlatRecord, Scalar};

/// One search hit, passed through as returned.
pub type Hit = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultPage {
    pub hits: Vec<Hit>,
    pub total: u64,
}

impl SearchResultPage {
    pub fn from_value(value: &Value) -> Result<Self> {
        let total = value
            .get("total")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::UnexpectedResponse("response has no total".to_string()))?;

        let hits = match value.get("hits") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::Object(hit) => Ok(hit.clone()),
                    _ => Err(Error::UnexpectedResponse("hit is not an object".to_string())),
                })
                .collect::<Result<Vec<_>>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(Error::UnexpectedResponse("hits is not a list".to_string()));
            }
        };

        Ok(Self { hits, total })
    }
}

/// Record search over a [`Transport`].
pub struct SuperSearch<'a> {
    transport: &'a dyn Transport,
}

impl<'a> SuperSearch<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Start a fresh walk over the pages of `params`, stopping after `limit` hits.
    pub fn fetch(&self, params: &SearchParams, limit: Limit) -> Paginator<'a> {
        Paginator::new(self.transport, params.clone(), limit)
    }
}

/// Cursor over the pages of one query.
pub struct Paginator<'a> {
    transport: &'a dyn Transport,
    params: SearchParams,
    limit: Limit,
    offset: u64,
    page_size: u64,
    count: u64,
    total: Option<u64>,
    done: bool,
}

impl<'a> Paginator<'a> {
    fn new(transport: &'a dyn Transport, params: SearchParams, limit: Limit) -> Self {
        let page_size = limit.min_with(MAX_PAGE);
        Self {
            transport,
            params,
            limit,
            offset: 0,
            page_size,
            count: 0,
            total: None,
            done: page_size == 0,
        }
    }

    /// Hits yielded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total reported by the service, once the first page has arrived.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Fetch the next page. `Ok(None)` once the limit, the total, or an empty
    /// page has been reached.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Hit>>> {
        if self.done {
            return Ok(None);
        }

        let page = match self.request_page().await {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };

        if let Some(previous) = self.total {
            if previous != page.total {
                self.done = true;
                return Err(Error::TransientService {
                    status: 200,
                    message: format!(
                        "total changed from {} to {} while paging; results would be inconsistent",
                        previous, page.total
                    ),
                });
            }
        }
        self.total = Some(page.total);

        let page_was_empty = page.hits.is_empty();
        let mut hits = page.hits;
        let room = self.limit.remaining(self.count).min_with(hits.len() as u64);
        hits.truncate(room as usize);
        self.count += room;

        if self.limit <= self.count || page_was_empty || self.count >= page.total {
            self.done = true;
        } else {
            self.offset += MAX_PAGE;
            self.page_size = self
                .limit
                .remaining(self.count)
                .min_with(MAX_PAGE.min(page.total - self.count));
        }

        Ok(Some(hits))
    }

    async fn request_page(&self) -> Result<SearchResultPage> {
        let params = self
            .params
            .with(RESULTS_OFFSET, self.offset)
            .with(RESULTS_NUMBER, self.page_size);
        debug!(offset = self.offset, page_size = self.page_size, "fetching page");

        let body = self
            .transport
            .get_json(SUPERSEARCH_ENDPOINT, &params.to_query_pairs())
            .await?;
        SearchResultPage::from_value(&body)
    }

    /// Lazily yield hits one at a time across pages.
    pub fn into_stream(self) -> Pin<Box<dyn Stream<Item = Result<Hit>> + Send + 'a>> {
        Box::pin(async_stream::try_stream! {
            let mut paginator = self;
            while let Some(batch) = paginator.next_batch().await? {
                for hit in batch {
                    yield hit;
                }
            }
        })
    }

    /// Like [`Paginator::into_stream`], but each hit is cut down to `columns`.
    /// The stream fails at the first hit missing a column.
    pub fn into_records(
        self,
        columns: Vec<String>,
    ) -> Pin<Box<dyn Stream<Item = Result<FlatRecord>> + Send + 'a>> {
        Box::pin(async_stream::try_stream! {
            let mut paginator = self;
            while let Some(batch) = paginator.next_batch().await? {
                for hit in batch {
                    yield hit_to_record(&hit, &columns)?;
                }
            }
        })
    }
}

/// `_columns` defaults to `uuid`. Without an explicit sort or date filter the
/// most recent crash reports come first.
pub fn with_record_defaults(mut params: SearchParams) -> SearchParams {
    params.set_default(COLUMNS, ["uuid"]);
    if !params.contains(SORT) && !params.contains(DATE) {
        params.set(SORT, ["-date"]);
    }
    params
}

/// The `_columns` a record search reports, in request order.
pub fn record_columns(params: &SearchParams) -> Vec<String> {
    params.get(COLUMNS).unwrap_or_default().to_vec()
}

/// Pick `columns` out of `hit` in order.
///
/// Fails with `MissingField` naming the first column the hit lacks.
pub fn hit_to_record(hit: &Hit, columns: &[String]) -> Result<FlatRecord> {
    let mut record = FlatRecord::new();
    for column in columns {
        let value = hit
            .get(column)
            .ok_or_else(|| Error::MissingField(column.clone()))?;
        record.insert(column.as_str(), Scalar::from_json(value));
    }
    Ok(record)
}
