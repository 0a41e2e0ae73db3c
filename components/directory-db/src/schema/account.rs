diesel::table! {
    accounts (account_id) {
        account_id -> Text,
        api_token -> Text,
        email -> Text,
        name -> Text,
        last_accessed -> Nullable<Timestamptz>,
    }
}

// Constraint names as declared in sql/accounts.sql. Unique violations are
// reported by name, so these must stay in sync with the DDL.
pub const ACCOUNTS_PKEY: &str = "accounts_pkey";
pub const ACCOUNTS_API_TOKEN_KEY: &str = "accounts_api_token_key";
pub const ACCOUNTS_EMAIL_KEY: &str = "accounts_email_key";
