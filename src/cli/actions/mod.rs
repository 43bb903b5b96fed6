pub mod hash_password;
pub mod server;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    HashPassword,
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
            Self::HashPassword => hash_password::execute(),
        }
    }
}
