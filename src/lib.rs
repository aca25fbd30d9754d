/*!
# Catalog Admin

Category management for the store's administration area, built in Rust.

## Overview

The catalog API keeps the category taxonomy as a flat table: one row per
category, with depth encoded in the positional columns
`DEPT > TYP > SUBTYP_1 > SUBTYP_2 > SUBTYP_3` and `"EMPTY"` (or `""`) marking
the columns a row does not use. This crate rebuilds that table into a tree,
lets an operator browse it as a collapsible, searchable, paginated list, and
drives the delete action against the API.

## Architecture

### Core (no features)
- **records**: wire types for the category list and detail endpoints
- **taxonomy**: tree builder and flattener
- **listing**: search and status filters, pagination, the screen's view model
- **delete_flow**: the `idle -> confirming -> deleting -> idle` delete action
- **saving**: gzip + bincode snapshots of a fetched taxonomy for offline use
- **downloader**: CSV export of the current listing

### Web layer (`web` feature)
- **config**: command line / environment settings
- **client**: async client for `/api/admin/catalog/categories`
- **app**: axum admin front serving the category screen and its JSON model

## Data flow

```text
rows --build_forest--> forest --flatten(expanded)--> flat list
     --search/status--> filtered --paginate(page, 10)--> page
```

Everything after the fetch is a pure function of the rows, the expansion
set and the query, recomputed on every request.

## Binaries

- `website` - the admin web front
- `console` - the same screen in a terminal command loop
*/

pub mod delete_flow;
pub mod downloader;
pub mod error;
pub mod listing;
pub mod records;
pub mod saving;
pub mod taxonomy;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod client;
#[cfg(feature = "web")]
pub mod config;

/// Re-export the types most callers need
pub use error::{CatalogError, Result};
pub use listing::{CategoryListing, ListingQuery, Page, StatusFilter};
pub use records::{CategoryDetail, TaxonomyRow};
pub use taxonomy::{CategoryNode, FlatNode, Forest, build_forest, build_tree, flatten};
