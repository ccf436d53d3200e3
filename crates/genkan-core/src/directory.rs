//! [`IdentityDirectory`] — create-or-update-by-card for [`Person`] records.

use crate::{
  clock::Clock,
  error::{Error, Result},
  id::{CardId, UserId},
  person::Person,
  store::KeyValueStore,
};

/// The person/card directory.
///
/// Holds a store and a clock by composition. There are no internal retries:
/// a save that loses an optimistic-concurrency race surfaces the conflict to
/// the caller.
#[derive(Debug, Clone)]
pub struct IdentityDirectory<S, C> {
  store: S,
  clock: C,
}

impl<S, C> IdentityDirectory<S, C>
where
  S: KeyValueStore<Person>,
  C: Clock,
{
  pub fn new(store: S, clock: C) -> Self { Self { store, clock } }

  /// Look up the person bound to a card. `None` if the card is unknown.
  pub async fn find_by_card_id(
    &self,
    card_id: &CardId,
  ) -> Result<Option<Person>> {
    Ok(self.store.get(card_id).await?)
  }

  /// Create the person for `card_id`, or update their name.
  ///
  /// A card, once bound to a `user_id`, stays bound: a save whose `user_id`
  /// disagrees with the stored one is rejected with
  /// [`Error::IdentityConflict`] and writes nothing.
  pub async fn save(
    &self,
    card_id: &CardId,
    user_id: &UserId,
    name: &str,
  ) -> Result<()> {
    let existing = self.store.get(card_id).await?;
    let now = self.clock.now_utc();

    match existing {
      None => {
        let person = Person {
          card_id:    card_id.clone(),
          user_id:    user_id.clone(),
          name:       name.to_owned(),
          status:     true,
          created_at: now,
          updated_at: None,
          version:    0,
        };
        self.store.put(&person).await?;
        Ok(())
      }

      Some(person) if person.user_id == *user_id => {
        let expected = person.version;
        let updated = Person {
          name: name.to_owned(),
          updated_at: Some(now),
          version: expected + 1,
          ..person
        };
        self.store.conditional_update(&updated, expected).await?;
        Ok(())
      }

      Some(person) => Err(Error::IdentityConflict {
        card_id: card_id.clone(),
        stored:  person.user_id,
      }),
    }
  }
}
