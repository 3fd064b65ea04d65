//! Site adapters, one per content domain.
//!
//! # Supported Sources
//!
//! | Domain | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | News headlines | [`news`] | HTTP, then browser | Kompas, Detik, Tribun by default |
//! | Books | [`books`] | Browser with scrolling | Gramedia international catalog |
//! | Trending anime | [`anime`] | GraphQL API, then HTML | AniList |
//!
//! # Common Patterns
//!
//! Each adapter exports a `collect` function returning its records. Adapters
//! never return errors: a failed target becomes absent fields (news) or is
//! left out (books, anime), with the reason logged.

pub mod anime;
pub mod books;
pub mod news;
