//! Indexer query service client.
//!
//! Listings: `POST {base}/query/{collection}` with an [`IndexerQuery`] body,
//! answered by `{"items": [...]}`. Lookups: `GET {base}/{collection}/{id}`,
//! where 404 means the entity does not exist.

use crate::chain::fetch::{endpoint, FetchError, Fetcher};
use crate::query::{Collection, IndexerQuery};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound on pages walked by [`IndexerClient::query_all`].
const MAX_PAGES: u32 = 1_000;

#[derive(Deserialize)]
struct Items<T> {
    items: Vec<T>,
}

pub(crate) struct IndexerClient {
    base: Url,
    fetcher: Fetcher,
}

impl IndexerClient {
    pub(crate) fn new(base: Url, fetcher: Fetcher) -> Self {
        Self { base, fetcher }
    }

    /// One page. Never returns more than the page size asked for.
    pub(crate) async fn query<T: DeserializeOwned>(
        &self,
        query: &IndexerQuery,
    ) -> Result<Vec<T>, FetchError> {
        let url = endpoint(&self.base, &format!("query/{}", query.collection))?;
        debug!(
            collection = %query.collection,
            skip = query.skip,
            first = query.first,
            key = %query.fingerprint(),
            "indexer query"
        );
        let body = self
            .fetcher
            .post_json(&url, &serde_json::to_value(query)?)
            .await?;
        let mut page: Items<T> = serde_json::from_str(&body)?;
        let limit = query.first as usize;
        if page.items.len() > limit {
            warn!(
                collection = %query.collection,
                got = page.items.len(),
                limit,
                "indexer returned an oversized page"
            );
            page.items.truncate(limit);
        }
        Ok(page.items)
    }

    /// Walk pages from the query's window until the indexer returns a short
    /// page. A full page identical to the previous one means the indexer is
    /// ignoring `skip`, which fails instead of looping.
    pub(crate) async fn query_all<T: DeserializeOwned>(
        &self,
        query: &IndexerQuery,
    ) -> Result<Vec<T>, FetchError> {
        let mut page = query.page();
        let mut out = Vec::new();
        let mut previous: Option<Vec<Value>> = None;
        for _ in 0..MAX_PAGES {
            let items: Vec<Value> = self.query(&query.with_page(page)).await?;
            if items.len() < page.take as usize {
                for item in &items {
                    out.push(T::deserialize(item)?);
                }
                info!(collection = %query.collection, count = out.len(), "query_all");
                return Ok(out);
            }
            if previous.as_ref() == Some(&items) {
                warn!(collection = %query.collection, skip = page.skip, "indexer repeated a page");
                return Err(FetchError::Malformed(format!(
                    "{}: page at skip {} repeats the previous page",
                    query.collection, page.skip
                )));
            }
            for item in &items {
                out.push(T::deserialize(item)?);
            }
            previous = Some(items);
            page = page.next();
        }
        warn!(collection = %query.collection, pages = MAX_PAGES, "page limit reached");
        Err(FetchError::Malformed(format!(
            "{}: more than {MAX_PAGES} full pages",
            query.collection
        )))
    }

    pub(crate) async fn lookup<T: DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<T>, FetchError> {
        let path = format!("{}/{}", collection, urlencoding::encode(id));
        let url = endpoint(&self.base, &path)?;
        match self.fetcher.get_optional(&url).await? {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn request_count(&self) -> u64 {
        self.fetcher.request_count()
    }
}
