use driver::database::PostgresDatabase;
use error_stack::Report;
use kernel::prelude::policy::RatingPolicy;
use kernel::KernelError;
use std::ops::Deref;
use std::sync::Arc;
use vodca::References;

static RATING_POLICY: &str = "RATING_POLICY";

#[derive(Clone)]
pub struct AppModule(Arc<Handler>);

impl AppModule {
    pub async fn new() -> error_stack::Result<Self, KernelError> {
        Ok(Self(Arc::new(Handler::init().await?)))
    }
}

impl Deref for AppModule {
    type Target = Handler;
    fn deref(&self) -> &Self::Target {
        Deref::deref(&self.0)
    }
}

#[derive(References)]
pub struct Handler {
    database: PostgresDatabase,
    rating_policy: RatingPolicy,
}

impl Handler {
    pub async fn init() -> error_stack::Result<Self, KernelError> {
        let database = PostgresDatabase::new().await?;
        let rating_policy = match std::env::var(RATING_POLICY) {
            Ok(name) => RatingPolicy::from_name(&name).ok_or_else(|| {
                Report::new(KernelError::Internal)
                    .attach_printable(format!("unknown {RATING_POLICY} value {name}"))
            })?,
            Err(_) => RatingPolicy::default(),
        };

        Ok(Self {
            database,
            rating_policy,
        })
    }
}
