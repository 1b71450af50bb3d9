//! Cross-cutting response middleware. JWT auth, rate limiting, and request
//! transformation have no counterpart in this gateway's scope and are not
//! carried forward from the teacher.

pub mod security;
