// Copyright (c) 2016 Chef Software Inc. and/or applicable contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use chrono::{DateTime,
             Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::account::accounts;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Account {
    pub account_id:    String,
    pub api_token:     String,
    pub email:         String,
    pub name:          String,
    pub last_accessed: Option<DateTime<Utc>>,
}

/// A row about to be inserted. `last_accessed` is left to the column default
/// (NULL) until the first successful touch.
#[derive(Clone, Debug, PartialEq, Eq, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub account_id: String,
    pub api_token:  String,
    pub email:      String,
    pub name:       String,
}

impl NewAccount {
    /// Builds a row with freshly generated identifiers. Both the id and the
    /// token are random v4 UUIDs.
    pub fn generate(email: &str, name: &str) -> Self {
        NewAccount { account_id: Uuid::new_v4().to_string(),
                     api_token:  Uuid::new_v4().to_string(),
                     email:      email.to_string(),
                     name:       name.to_string(), }
    }
}

impl From<NewAccount> for Account {
    fn from(new: NewAccount) -> Self {
        Account { account_id:    new.account_id,
                  api_token:     new.api_token,
                  email:         new.email,
                  name:          new.name,
                  last_accessed: None, }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_draws_distinct_identifiers() {
        let a = NewAccount::generate("a@x.com", "A");
        let b = NewAccount::generate("a@x.com", "A");

        assert_ne!(a.account_id, b.account_id);
        assert_ne!(a.api_token, b.api_token);
        assert_ne!(a.account_id, a.api_token);
        assert!(Uuid::parse_str(&a.api_token).is_ok());
    }

    #[test]
    fn account_serializes_with_null_last_accessed() {
        let account = Account::from(NewAccount { account_id: "id-1".to_string(),
                                                 api_token:  "tok-1".to_string(),
                                                 email:      "a@x.com".to_string(),
                                                 name:       "A".to_string(), });

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json,
                   serde_json::json!({
                       "account_id": "id-1",
                       "api_token": "tok-1",
                       "email": "a@x.com",
                       "name": "A",
                       "last_accessed": null,
                   }));
    }

    #[test]
    fn last_accessed_serializes_as_rfc3339() {
        let account = Account { last_accessed: Some("2022-05-01T10:20:30Z".parse().unwrap()),
                                ..Account::from(NewAccount::generate("b@x.com", "B")) };

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["last_accessed"], "2022-05-01T10:20:30Z");
    }
}
