/*!
# AI Product Rankings

Publishes a spreadsheet of AI-product rankings as JSON.

## Overview

Editors maintain the rankings in a workbook with two sheets, `Web` and `App`.
The workbook is uploaded, converted into a unified collection of typed records,
and stored as a JSON snapshot that every page and API endpoint reads from.

## Architecture

### Ingestion
- **record**: `Record`, `ListKind` and the mapping from a header-keyed row to a record
- **reader**: opens `.xlsx`/`.xls` workbooks (path or bytes) and turns sheets into rows
- **ingest**: routes the `Web`/`App` sheets through the mapper and reports diagnostics
- **collection**: the `{ Web, App, all }` collection and client-body validation

### Persistence
- **snapshot**: canonical JSON file with timestamped backups, atomic replace and retention

### Presentation helpers
- **template**: blank workbook templates with the exact header rows
- **view**: search / category / sort state over one ranking list
- **description**: generated product write-ups, cached one file per product
- **links**: App Store link lookup

### Serving (feature `web`)
- **app**: axum routes in front of the snapshot store and the pipeline

## Data Flow

```text
workbook bytes -> reader -> rows -> record::map_row -> AppLists -> snapshot -> app
```

Ingestion never writes: the uploaded collection is returned to the client, which
then posts it to `/api/save-data` to replace the snapshot.

## REST API Endpoints

- `GET /api/data` - the merged `all` list
- `GET /api/excel-data` - the whole collection
- `GET /api/list/{Web|App|all}` - one list, with optional `search`, `category`, `sort`, `order`
- `GET /api/categories/{Web|App|all}` - categories of one list
- `POST /api/upload` - parse a workbook (multipart field `file`)
- `POST /api/save-data` - replace the snapshot
- `GET /api/excel-template?type={Web|App|All}` - download a template
- `GET /api/description/{id}` - cached description (empty when none)
- `POST /api/generate-description` - render and cache a description (`force` to re-render)
- `GET /api/app-store?name=` - App Store link for a product
*/

pub mod collection;
pub mod config;
pub mod description;
pub mod error;
pub mod ingest;
pub mod links;
pub mod reader;
pub mod record;
pub mod snapshot;
pub mod template;
pub mod view;

#[cfg(feature = "web")]
pub mod app;

pub use collection::AppLists;
pub use config::Config;
pub use description::{DescriptionRequest, DescriptionStore};
pub use error::{AppError, AppResult};
pub use ingest::{IngestReport, ingest, ingest_bytes, ingest_path};
pub use record::{CellValue, ListKind, RawRow, Record, map_row};
pub use snapshot::SnapshotStore;
pub use template::TemplateKind;
