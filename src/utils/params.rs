//! Request parameter validation helpers.

use mongodb::bson::oid::ObjectId;

use crate::utils::envelope::ApiError;

const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 100;

/// Parses a path/body identifier into an `ObjectId`, rejecting malformed
/// values with a 400 before any store access happens.
pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::bad_request(format!("invalid {} id", what)))
}

/// Normalizes page/limit query values: pages start at 1, the page size is
/// capped so a client cannot request unbounded result sets.
pub fn pagination(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex(), "video").unwrap(), id);

        let err = parse_object_id("not-an-id", "video").unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
        assert!(err.message().contains("video"));
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(pagination(None, None), (1, 10));
        assert_eq!(pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(pagination(Some(3), Some(500)), (3, 100));
    }
}
