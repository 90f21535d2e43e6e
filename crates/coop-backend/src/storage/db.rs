//! `SQLite` database for the coop backend.

coop_core::define_database!(BackendDatabase, "Backend database migrations complete");
