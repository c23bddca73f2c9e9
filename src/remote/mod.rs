//! The remote is whatever actually talks to the backend. We don't care how it
//! gets there (HTTP, carrier pigeon) as long as it speaks these types. Calls
//! block; the dispatcher is responsible for running them off the caller's
//! thread when it needs to.

pub mod memory;

use crate::error::RResult;
use crate::models::acl::Acl;
use crate::util::Timestamp;
use crate::util::json::{Map, Value};

/// Everything the backend needs to create or update one record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SaveRequest {
    #[serde(rename = "className")]
    pub class_name: String,
    /// None creates, Some updates
    #[serde(rename = "objectId", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub fields: Map<String, Value>,
    /// Keys to delete server-side
    #[serde(rename = "deletedKeys", default)]
    pub deleted_keys: Vec<String>,
    #[serde(rename = "ACL", default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Acl>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SaveResponse {
    #[serde(rename = "objectId")]
    pub object_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub fields: Map<String, Value>,
    #[serde(rename = "createdAt")]
    pub created_at: Timestamp,
    #[serde(rename = "updatedAt")]
    pub updated_at: Timestamp,
    #[serde(rename = "ACL", default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<Acl>,
}

/// The backend, as far as we're concerned. Timeouts are the implementor's
/// business and should come back as `RError::Network`.
pub trait Remote: Send + Sync + 'static {
    fn create_or_update(&self, req: &SaveRequest) -> RResult<SaveResponse>;

    fn delete(&self, class_name: &str, object_id: &str) -> RResult<()>;

    fn fetch(&self, class_name: &str, object_id: &str) -> RResult<FetchResponse>;

    /// Save a list of records in one go. The outer error means the whole call
    /// failed, otherwise we get one result per request, in request order.
    ///
    /// Override me if the backend has a real batch endpoint.
    fn batch_create_or_update(&self, reqs: &[SaveRequest]) -> RResult<Vec<RResult<SaveResponse>>> {
        Ok(reqs.iter().map(|req| self.create_or_update(req)).collect())
    }
}
