use crate::api::attendance::{BatchRequest, RecordRequest, ResetRequest};
use crate::model::camper::RosterEntry;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Camp Operations API",
        version = "1.0.0",
        description = r#"
## Camp Attendance Service

Attendance tracking for a children's summer camp.

### Key Features
- **Daily attendance** — present / absent / late per camper, with a 5:00 PM day lock
- **Kid Connection** — independent before/after-care toggles
- **Early pickup** — dependent toggle on top of a present/late daily status
- **Bulk operations** — mark all present, unmark all, reset a program/day
- **Admin views** — per-program summaries and per-camper detail

### Response Format
JSON-based RESTful responses; mutation responses carry `success` plus the
applied status or affected count.
"#,
    ),
    paths(
        crate::api::attendance::record,
        crate::api::attendance::record_batch,
        crate::api::attendance::reset,
        crate::api::attendance::campers,
        crate::api::attendance::summary,
        crate::api::attendance::detail,
        crate::api::attendance::checkpoints,
        crate::api::attendance::week_info,
    ),
    components(
        schemas(
            RecordRequest,
            BatchRequest,
            ResetRequest,
            RosterEntry,
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance recording and admin views"),
    )
)]
pub struct ApiDoc;
