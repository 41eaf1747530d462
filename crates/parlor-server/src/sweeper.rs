//! Periodic forfeit of games nobody has touched for too long.

use std::{sync::Arc, time::Duration};

use chrono::{TimeDelta, Utc};
use parlor_core::{
  ids::GameId,
  lobby::Lobby,
  store::{Directory, GameStore},
};
use tokio::time::MissedTickBehavior;

/// Forfeit every game idle for longer than `idle`.
pub async fn sweep_once<S, D>(lobby: &Lobby<S, D>, idle: TimeDelta) -> parlor_core::Result<Vec<GameId>>
where
  S: GameStore,
  D: Directory,
{
  lobby.forfeit_stale(Utc::now() - idle).await
}

/// Run [`sweep_once`] every `every`, forever. Failures are logged and the
/// next tick tries again.
pub async fn run<S, D>(lobby: Arc<Lobby<S, D>>, idle: TimeDelta, every: Duration)
where
  S: GameStore,
  D: Directory,
{
  let mut ticker = tokio::time::interval(every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    ticker.tick().await;
    match sweep_once(&lobby, idle).await {
      Ok(ended) if !ended.is_empty() => {
        tracing::info!(count = ended.len(), "forfeited idle games");
      }
      Ok(_) => {}
      Err(e) => tracing::warn!(error = %e, "forfeit sweep failed"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parlor_core::{
    game::GameKind,
    ids::UserId,
    lobby::{ColorAssignment, LobbyConfig},
    memory::MemoryStore,
  };

  #[tokio::test]
  async fn sweep_forfeits_only_idle_games() {
    let store = MemoryStore::new();
    store.add_user(UserId(1), true);
    store.add_user(UserId(2), true);
    let lobby = Lobby::new(
      store.clone(),
      store,
      LobbyConfig { colors: ColorAssignment::SenderWhite },
    );
    let inv = lobby.create_invitation(UserId(1), UserId(2), GameKind::Chess).await.unwrap();
    lobby.respond_to_invitation(inv.game_id, UserId(2), true).await.unwrap();

    assert!(sweep_once(&lobby, TimeDelta::hours(1)).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(5)).await;
    let ended = sweep_once(&lobby, TimeDelta::zero()).await.unwrap();
    assert_eq!(ended, vec![inv.game_id]);
    assert_eq!(lobby.get_session(inv.game_id).await.unwrap().winner_id, Some(UserId(2)));
  }
}
