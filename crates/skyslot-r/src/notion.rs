use crate::{check, request_error};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use skyslot_engine::common::model::{ArchiveRecord, BlockKind, BlockSummary};
use skyslot_engine::stores::{DocumentStore, StoreError};
use tracing::debug;

const API_BASE: &str = "https://api.notion.com/v1";
pub const NOTION_VERSION: &str = "2022-06-28";
const PAGE_SIZE: u32 = 100;

/// Notion pages and databases over the public REST API.
pub struct NotionStore {
    client: reqwest::Client,
    token: String,
    base_url: String,
    title_property: String,
    date_property: String,
}

#[derive(Debug, Deserialize)]
pub struct ChildrenPage {
    pub results: Vec<RawBlock>,
    #[serde(default)]
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    pub image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub caption: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    results: Vec<PageRef>,
}

#[derive(Debug, Deserialize)]
struct PageRef {
    id: String,
}

impl From<RawBlock> for BlockSummary {
    fn from(raw: RawBlock) -> Self {
        let caption = raw
            .image
            .map(|image| {
                image
                    .caption
                    .into_iter()
                    .map(|t| t.plain_text)
                    .collect::<String>()
            })
            .filter(|c| !c.trim().is_empty());

        BlockSummary {
            id: raw.id,
            kind: BlockKind::from_type_name(&raw.kind),
            has_children: raw.has_children,
            caption,
        }
    }
}

impl NotionStore {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            base_url: API_BASE.to_string(),
            title_property: "Name".to_string(),
            date_property: "Date".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Names of the archive database's title and date properties.
    pub fn with_properties(mut self, title: impl Into<String>, date: impl Into<String>) -> Self {
        self.title_property = title.into();
        self.date_property = date.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, StoreError> {
        let response = builder.send().await.map_err(request_error)?;
        check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

pub fn children_path(block_id: &str, cursor: Option<&str>) -> String {
    match cursor {
        Some(cursor) => format!(
            "blocks/{}/children?page_size={}&start_cursor={}",
            block_id, PAGE_SIZE, cursor
        ),
        None => format!("blocks/{}/children?page_size={}", block_id, PAGE_SIZE),
    }
}

pub fn image_update_body(url: &str) -> Value {
    json!({ "image": { "external": { "url": url } } })
}

pub fn record_query_body(date_property: &str, date: NaiveDate) -> Value {
    json!({
        "filter": {
            "property": date_property,
            "date": { "equals": date.format("%Y-%m-%d").to_string() }
        },
        "page_size": 1
    })
}

pub fn page_body(
    database_id: &str,
    title_property: &str,
    date_property: &str,
    record: &ArchiveRecord,
) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            title_property: {
                "title": [{ "text": { "content": record.title } }]
            },
            date_property: {
                "date": { "start": record.date.format("%Y-%m-%d").to_string() }
            }
        },
        "children": [{
            "object": "block",
            "type": "image",
            "image": { "type": "external", "external": { "url": record.image_url } }
        }]
    })
}

#[async_trait]
impl DocumentStore for NotionStore {
    async fn list_children(&self, block_id: &str) -> Result<Vec<BlockSummary>, StoreError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let path = children_path(block_id, cursor.as_deref());
            let page: ChildrenPage = self.send(self.request(reqwest::Method::GET, &path)).await?;
            blocks.extend(page.results.into_iter().map(BlockSummary::from));

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!("Block {} has {} children", block_id, blocks.len());
        Ok(blocks)
    }

    async fn update_image_block(&self, block_id: &str, url: &str) -> Result<(), StoreError> {
        let path = format!("blocks/{}", block_id);
        let _: Value = self
            .send(
                self.request(reqwest::Method::PATCH, &path)
                    .json(&image_update_body(url)),
            )
            .await?;
        Ok(())
    }

    async fn create_page(
        &self,
        database_id: &str,
        record: &ArchiveRecord,
    ) -> Result<String, StoreError> {
        let body = page_body(
            database_id,
            &self.title_property,
            &self.date_property,
            record,
        );
        let created: PageRef = self
            .send(self.request(reqwest::Method::POST, "pages").json(&body))
            .await?;
        Ok(created.id)
    }

    async fn find_record(
        &self,
        database_id: &str,
        date: NaiveDate,
    ) -> Result<Option<String>, StoreError> {
        let path = format!("databases/{}/query", database_id);
        let body = record_query_body(&self.date_property, date);
        let found: QueryResult = self
            .send(self.request(reqwest::Method::POST, &path).json(&body))
            .await?;
        Ok(found.results.into_iter().next().map(|p| p.id))
    }
}
