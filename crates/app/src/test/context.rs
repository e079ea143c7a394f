//! Test context for service-level integration tests.

use sqlx::{Connection, PgConnection, PgPool, query};

use crate::{
    database::Db,
    domain::{books::PgBooksService, orders::PgPendingOrdersService},
    identity::UserUuid,
};

use super::db::{SUPERUSER, SUPERUSER_PASSWORD, TestDb};

/// Non-superuser role the services connect as, so row-level security applies.
const APP_ROLE: &str = "bookshelf_app_test";
const APP_ROLE_PASSWORD: &str = "bookshelf_app_test_pass";

pub struct TestContext {
    pub db: TestDb,
    pub user_uuid: UserUuid,
    pub books: PgBooksService,
    pub orders: PgPendingOrdersService,
}

impl TestContext {
    pub async fn new() -> Self {
        let test_db = TestDb::new().await;

        let db = Db::new(Self::setup_app_pool(&test_db).await);

        Self {
            books: PgBooksService::new(db.clone()),
            orders: PgPendingOrdersService::new(db),
            user_uuid: UserUuid::now_v7(),
            db: test_db,
        }
    }

    /// Superusers bypass RLS even with `FORCE ROW LEVEL SECURITY`, so create a restricted role
    /// (once per server) and connect as it.
    async fn setup_app_pool(test_db: &TestDb) -> PgPool {
        let su_url = &test_db.superuser_url;

        // CREATE ROLE is server-scoped; run it against the maintenance database.
        let server_url = su_url.rsplit_once('/').map_or(su_url.as_str(), |x| x.0);
        let server_url = format!("{server_url}/postgres");

        let mut server_conn = PgConnection::connect(&server_url)
            .await
            .expect("Failed to connect to postgres database for role setup");

        let created = query(&format!(
            "CREATE ROLE {APP_ROLE} WITH LOGIN PASSWORD '{APP_ROLE_PASSWORD}' \
               NOSUPERUSER NOCREATEDB NOCREATEROLE"
        ))
        .execute(&mut server_conn)
        .await;

        // Parallel tests race to create the role: duplicate_object (42710) or unique_violation
        // (23505) both mean it exists.
        match created {
            Ok(_) => {}
            Err(sqlx::Error::Database(ref error))
                if matches!(error.code().as_deref(), Some("42710" | "23505")) => {}
            Err(error) => panic!("Failed to create app role: {error}"),
        }

        query(&format!(
            "GRANT CONNECT ON DATABASE \"{}\" TO {APP_ROLE}",
            test_db.name
        ))
        .execute(&mut server_conn)
        .await
        .expect("Failed to grant CONNECT on test database");

        server_conn
            .close()
            .await
            .expect("Failed to close server connection");

        let mut db_conn = PgConnection::connect(su_url)
            .await
            .expect("Failed to connect to test database for privilege setup");

        for stmt in [
            format!("GRANT USAGE ON SCHEMA public TO {APP_ROLE}"),
            format!(
                "GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA public TO {APP_ROLE}"
            ),
        ] {
            query(&stmt)
                .execute(&mut db_conn)
                .await
                .expect("Failed to grant table privileges to app role");
        }

        db_conn
            .close()
            .await
            .expect("Failed to close db connection");

        let app_url = su_url.replacen(
            &format!("{SUPERUSER}:{SUPERUSER_PASSWORD}"),
            &format!("{APP_ROLE}:{APP_ROLE_PASSWORD}"),
            1,
        );

        PgPool::connect(&app_url)
            .await
            .expect("Failed to create app pool")
    }
}
