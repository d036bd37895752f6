
use std::sync::Arc;

use crate::domain::entities::user::{Principal, User};
use crate::repositories::{MockTokenRepository, MockUserRepository, UserRepository};
use crate::services::token::{TokenService, TokenServiceConfig};

pub(super) type TestTokenService = TokenService<MockTokenRepository, MockUserRepository>;

/// Service wired to in-memory repositories with one registered principal
pub(super) struct Fixture {
    pub service: TestTokenService,
    pub tokens: MockTokenRepository,
    pub users: MockUserRepository,
    pub principal: Principal,
}

pub(super) async fn fixture() -> Fixture {
    fixture_with(TokenServiceConfig::default()).await
}

pub(super) async fn fixture_with(config: TokenServiceConfig) -> Fixture {
    let tokens = MockTokenRepository::new();
    let users = MockUserRepository::new();

    let mut user = User::new(
        "alice".to_string(),
        "Alice".to_string(),
        "$2b$04$unused".to_string(),
        "admin".to_string(),
    );
    user.add_role("customer");
    let user = users.create(user).await.unwrap();

    let service = TokenService::new(
        Arc::new(tokens.clone()),
        Arc::new(users.clone()),
        config,
    );

    Fixture {
        service,
        tokens,
        users,
        principal: user.principal(),
    }
}
