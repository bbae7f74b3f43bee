/*!
# Rowgrid

A small single-tenant web application exposing a spreadsheet-style editor
over a row-oriented employee table, gated by username/password
authentication.

## Architecture

The application follows a client-server architecture:

### Frontend Layer
- **Technologies**: HTML, Handsontable (CDN), plain `fetch`
- **Key Components**:
  - Grid page - renders the employee table and captures edits
  - Reconciliation client - diffs the edited grid against the last-loaded
    snapshot and dispatches updates, inserts, and deletes in that order
  - Debug panel - on-screen log of request failures
  - Login page - obtains and stores the bearer session token

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Record Store - CRUD over the employee table, persisted as JSON
  - Credential Service - registration, login, logout, identity lookup
  - Session Store - volatile map of bearer tokens to user identities
  - Reconciliation Protocol - snapshot diff and ordered batch dispatch

## Modules

- **records**: `Record` and `RecordFields` data model and normalization
- **reconcile**: snapshot diff and ordered batch dispatch
- **session**: session token store with expiry
- **store**: persistence for the users and employees tables
- **login**: authentication handlers and the bearer-token middleware
- **app**: routing, record endpoint handlers, and the server loop

## REST API Endpoints

- `POST /register`, `POST /login`, `POST /logout` - account lifecycle
- `GET /user/me` - identity behind the caller's session token
- `GET /data` - list records
- `POST /data` - create a record (id assigned by the store)
- `PUT /data/{id}` - overwrite a record's tracked fields
- `DELETE /data/{id}` - delete a record

All `/data` and `/user/me` routes require an `Authorization: Bearer` session
token obtained from `POST /login`.
*/

pub mod app;
pub mod login;
pub mod reconcile;
pub mod records;
pub mod session;
pub mod store;

pub use records::{Record, RecordFields};
pub use reconcile::{ReconcilePlan, RecordSink, diff, dispatch};
