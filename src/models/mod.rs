// Data models for the e-service API

pub mod envelope;
pub mod license;
pub mod request;

pub use envelope::{ApiEnvelope, Pagination};
pub use license::{
    InspectorAssignment, LicenseRequestSubmission, LicenseRequestType, Notification, PageQuery,
    ReviewDecision, ReviewRequest, UnreadCount,
};
pub use request::{PendingRequest, RequestBody, RequestOptions};
