//! End-to-end room flows driven through the registry and actor handles with
//! fake message-channel subscribers.


use rank_rally_server::protocol::{
    ClientMessage, ErrorCode, RoomOptionsPatch, RoomStatus, ServerEvent,
};
use test_helpers::{create_test_registry, quick_game_patch, TestSubscriber};

fn no_timer_patch(items_per_game: u32) -> RoomOptionsPatch {
    RoomOptionsPatch {
        timer_enabled: Some(false),
        ranking_timeout_s: Some(0),
        items_per_game: Some(items_per_game),
        ..RoomOptionsPatch::default()
    }
}

#[tokio::test]
async fn solo_game_end_to_end() {
    let registry = create_test_registry();
    let reply = registry
        .create_room(Some("ABCD"), "A", Some(&quick_game_patch()))
        .unwrap();
    let a = reply.player_id;
    assert_eq!(reply.room.status, RoomStatus::Lobby);
    assert_eq!(reply.room.host_id, a);

    let room = registry.get("ABCD").unwrap();
    let mut sub = TestSubscriber::attach_identified(&room, a).await;

    let started = room.start(a).await.unwrap();
    assert_eq!(started.room.status, RoomStatus::InProgress);
    assert_eq!(started.room.current_turn_player_id, Some(a));
    sub.wait_for(|e| matches!(e, ServerEvent::GameStarted)).await;

    // First item: emitted once, with its final emoji, then the turn wraps
    // back to the only player.
    sub.send(ClientMessage::SubmitItem {
        text: "x".to_string(),
    })
    .await;
    let item1 = match sub
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => {
            assert_eq!(item.text, "x");
            assert_eq!(item.emoji, "🍕");
            assert_eq!(item.submitted_by, a);
            item
        }
        _ => unreachable!(),
    };
    match sub
        .wait_for(|e| matches!(e, ServerEvent::TurnChanged { .. }))
        .await
    {
        ServerEvent::TurnChanged {
            player_id,
            timer_end_at,
        } => {
            assert_eq!(player_id, a);
            assert!(timer_end_at.is_none(), "timers are disabled");
        }
        _ => unreachable!(),
    }

    sub.send(ClientMessage::RankItem {
        item_id: item1.id,
        ranking: 1,
    })
    .await;
    sub.wait_for(|e| matches!(e, ServerEvent::RoomUpdated { .. }))
        .await;

    // Second item fills the room: ended atomically with the broadcast.
    sub.send(ClientMessage::SubmitItem {
        text: "y".to_string(),
    })
    .await;
    let item2 = match sub
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => item,
        _ => unreachable!(),
    };
    sub.wait_for(|e| matches!(e, ServerEvent::GameEnded)).await;

    sub.send(ClientMessage::RankItem {
        item_id: item2.id,
        ranking: 2,
    })
    .await;
    sub.wait_for(|e| matches!(e, ServerEvent::RoomUpdated { .. }))
        .await;

    let snapshot = room.snapshot().await.unwrap().room;
    assert_eq!(snapshot.status, RoomStatus::Ended);
    let results = snapshot.results.expect("ended rooms carry results");
    assert_eq!(results[0].text, "x");
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[1].text, "y");
    assert_eq!(results[1].rank, 2);
}

#[tokio::test]
async fn two_player_round_robin_turn_handoff() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("GHJK"), "H", Some(&no_timer_patch(5)))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("GHJK").unwrap();
    let g = room.join("G".to_string()).await.unwrap().player_id;

    let mut sub_h = TestSubscriber::attach_identified(&room, h).await;
    let mut sub_g = TestSubscriber::attach_identified(&room, g).await;

    room.start(h).await.unwrap();
    sub_h.wait_for(|e| matches!(e, ServerEvent::GameStarted)).await;
    sub_g.wait_for(|e| matches!(e, ServerEvent::GameStarted)).await;

    sub_h
        .send(ClientMessage::SubmitItem {
            text: "pizza".to_string(),
        })
        .await;
    let pizza = match sub_g
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => item,
        _ => unreachable!(),
    };
    match sub_g
        .wait_for(|e| matches!(e, ServerEvent::TurnChanged { .. }))
        .await
    {
        ServerEvent::TurnChanged { player_id, .. } => assert_eq!(player_id, g),
        _ => unreachable!(),
    }

    // Ranks are per-player: both may use the same slot for the same item.
    sub_g
        .send(ClientMessage::RankItem {
            item_id: pizza.id,
            ranking: 5,
        })
        .await;
    sub_g
        .wait_for(|e| matches!(e, ServerEvent::RoomUpdated { .. }))
        .await;
    sub_h
        .send(ClientMessage::RankItem {
            item_id: pizza.id,
            ranking: 5,
        })
        .await;
    sub_h
        .wait_for(|e| matches!(e, ServerEvent::RoomUpdated { .. }))
        .await;

    // Re-submitting the same text reads as a duplicate, targeted to the
    // sender only.
    sub_h
        .send(ClientMessage::SubmitItem {
            text: "pizza".to_string(),
        })
        .await;
    match sub_h
        .wait_for(|e| matches!(e, ServerEvent::Error { .. }))
        .await
    {
        ServerEvent::Error { code, .. } => assert_eq!(code, ErrorCode::DuplicateItem),
        _ => unreachable!(),
    }
    // Errors go to the originator only: G sees state updates, never the
    // duplicate error.
    let leftovers = sub_g.drain().await;
    assert!(leftovers
        .iter()
        .all(|e| !matches!(e, ServerEvent::Error { .. })));
}

#[tokio::test]
async fn submit_out_of_turn_is_rejected_without_state_change() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("NPQR"), "H", Some(&no_timer_patch(5)))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("NPQR").unwrap();
    let g = room.join("G".to_string()).await.unwrap().player_id;

    let _sub_h = TestSubscriber::attach_identified(&room, h).await;
    let mut sub_g = TestSubscriber::attach_identified(&room, g).await;
    room.start(h).await.unwrap();

    sub_g
        .send(ClientMessage::SubmitItem {
            text: "sneaky".to_string(),
        })
        .await;
    match sub_g
        .wait_for(|e| matches!(e, ServerEvent::Error { .. }))
        .await
    {
        ServerEvent::Error { code, .. } => assert_eq!(code, ErrorCode::NotYourTurn),
        _ => unreachable!(),
    }
    assert!(room.snapshot().await.unwrap().room.items.is_empty());
}

#[tokio::test]
async fn late_joiner_catches_up() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("LMNP"), "H", Some(&no_timer_patch(5)))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("LMNP").unwrap();
    let mut sub_h = TestSubscriber::attach_identified(&room, h).await;

    room.start(h).await.unwrap();
    sub_h.send(ClientMessage::SubmitItem {
        text: "a".to_string(),
    })
    .await;
    let item_a = match sub_h
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => item,
        _ => unreachable!(),
    };
    sub_h
        .send(ClientMessage::RankItem {
            item_id: item_a.id,
            ranking: 1,
        })
        .await;

    let late = room.join("L".to_string()).await.unwrap();
    let l = late.player_id;
    let snapshot_player = late
        .room
        .players
        .iter()
        .find(|p| p.id == l)
        .unwrap()
        .clone();
    assert!(snapshot_player.catching_up);
    assert_eq!(late.room.players.last().unwrap().id, l, "appended at the end");

    let mut sub_l = TestSubscriber::attach_identified(&room, l).await;
    sub_l
        .send(ClientMessage::RankItem {
            item_id: item_a.id,
            ranking: 3,
        })
        .await;
    let updated = sub_l
        .wait_for(|e| matches!(e, ServerEvent::RoomUpdated { .. }))
        .await;
    match updated {
        ServerEvent::RoomUpdated { room } => {
            let player = room.players.iter().find(|p| p.id == l).unwrap();
            assert!(!player.catching_up);
            assert_eq!(player.rankings.get(&item_a.id), Some(&3));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn host_migration_on_disconnect() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("QRST"), "H", Some(&no_timer_patch(5)))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("QRST").unwrap();
    let g = room.join("G".to_string()).await.unwrap().player_id;
    let k = room.join("K".to_string()).await.unwrap().player_id;

    let sub_h = TestSubscriber::attach_identified(&room, h).await;
    let mut sub_g = TestSubscriber::attach_identified(&room, g).await;
    let _sub_k = TestSubscriber::attach_identified(&room, k).await;

    // The host's only channel closes; earliest-joined connected player takes
    // the seat.
    sub_h.close().await;
    match sub_g
        .wait_for(|e| matches!(e, ServerEvent::PlayerLeft { .. }))
        .await
    {
        ServerEvent::PlayerLeft { player_id } => assert_eq!(player_id, h),
        _ => unreachable!(),
    }
    let updated = sub_g
        .wait_for(|e| matches!(e, ServerEvent::RoomUpdated { .. }))
        .await;
    match updated {
        ServerEvent::RoomUpdated { room } => assert_eq!(room.host_id, g),
        _ => unreachable!(),
    }

    // And the new host holds start authority.
    let started = room.start(g).await.unwrap();
    assert_eq!(started.room.status, RoomStatus::InProgress);
}

#[tokio::test]
async fn ranking_timer_auto_assigns_lowest_free_rank() {
    let registry = create_test_registry();
    let patch = RoomOptionsPatch {
        timer_enabled: Some(false),
        ranking_timeout_s: Some(1),
        items_per_game: Some(5),
        ..RoomOptionsPatch::default()
    };
    let created = registry.create_room(Some("TUVW"), "H", Some(&patch)).unwrap();
    let h = created.player_id;
    let room = registry.get("TUVW").unwrap();
    let g = room.join("G".to_string()).await.unwrap().player_id;

    let mut sub_h = TestSubscriber::attach_identified(&room, h).await;
    let _sub_g = TestSubscriber::attach_identified(&room, g).await;
    room.start(h).await.unwrap();

    sub_h
        .send(ClientMessage::SubmitItem {
            text: "q".to_string(),
        })
        .await;
    let q = match sub_h
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => item,
        _ => unreachable!(),
    };

    // Nobody ranks within the window; expiry assigns each player their own
    // lowest free rank, independently.
    let updated = sub_h
        .wait_for(|e| match e {
            ServerEvent::RoomUpdated { room } => {
                room.players.iter().all(|p| !p.rankings.is_empty())
            }
            _ => false,
        })
        .await;
    match updated {
        ServerEvent::RoomUpdated { room } => {
            for player in &room.players {
                assert_eq!(player.rankings.get(&q.id), Some(&1));
            }
            assert!(room.ranking_deadline.is_none(), "window closed");
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn reset_preserves_players_and_clears_game() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("WXYZ"), "H", Some(&quick_game_patch()))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("WXYZ").unwrap();
    let g = room.join("G".to_string()).await.unwrap().player_id;

    let mut sub_h = TestSubscriber::attach_identified(&room, h).await;
    let mut sub_g = TestSubscriber::attach_identified(&room, g).await;
    room.start(h).await.unwrap();

    // H submits, turn moves to G, G's submission ends the two-item game.
    sub_h
        .send(ClientMessage::SubmitItem {
            text: "x".to_string(),
        })
        .await;
    let x = match sub_h
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => item,
        _ => unreachable!(),
    };
    sub_g
        .send(ClientMessage::SubmitItem {
            text: "y".to_string(),
        })
        .await;
    let y = match sub_g
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => item,
        _ => unreachable!(),
    };
    sub_g.wait_for(|e| matches!(e, ServerEvent::GameEnded)).await;

    sub_h
        .send(ClientMessage::RankItem {
            item_id: x.id,
            ranking: 1,
        })
        .await;
    sub_g
        .send(ClientMessage::RankItem {
            item_id: y.id,
            ranking: 1,
        })
        .await;

    let before = room.snapshot().await.unwrap().room;
    assert_eq!(before.status, RoomStatus::Ended);

    sub_h.send(ClientMessage::ResetRoom).await;
    let reset_room = match sub_g
        .wait_for(|e| matches!(e, ServerEvent::RoomReset { .. }))
        .await
    {
        ServerEvent::RoomReset { room } => room,
        _ => unreachable!(),
    };

    assert_eq!(reset_room.status, RoomStatus::Lobby);
    assert!(reset_room.items.is_empty());
    assert!(reset_room.current_turn_index.is_none());
    assert!(reset_room.turn_deadline.is_none());
    assert!(reset_room.results.is_none());
    assert_eq!(reset_room.players.len(), 2);
    for player in &reset_room.players {
        assert!(player.rankings.is_empty());
    }
    // Identity survives the reset.
    let ids_before: Vec<_> = before.players.iter().map(|p| (p.id, p.nickname.clone())).collect();
    let ids_after: Vec<_> = reset_room
        .players
        .iter()
        .map(|p| (p.id, p.nickname.clone()))
        .collect();
    assert_eq!(ids_before, ids_after);

    // Reset then start yields a playable room again, same seats.
    let restarted = room.start(h).await.unwrap().room;
    assert_eq!(restarted.status, RoomStatus::InProgress);
    assert_eq!(restarted.current_turn_player_id, Some(h));
}

#[tokio::test]
async fn identify_is_idempotent() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("BCDF"), "H", Some(&no_timer_patch(5)))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("BCDF").unwrap();

    let mut sub = TestSubscriber::attach_identified(&room, h).await;

    // Second identify from the same subscriber: one direct refresh, no
    // reconnect broadcast.
    sub.send(ClientMessage::Identify { player_id: h }).await;
    let event = sub.recv().await;
    assert!(matches!(event, ServerEvent::RoomUpdated { .. }));
    sub.expect_silence().await;
}

#[tokio::test]
async fn anonymous_subscribers_cannot_mutate() {
    let registry = create_test_registry();
    registry
        .create_room(Some("FGHJ"), "H", Some(&no_timer_patch(5)))
        .unwrap();
    let room = registry.get("FGHJ").unwrap();

    let mut sub = TestSubscriber::attach(&room).await;
    sub.send(ClientMessage::SubmitItem {
        text: "nope".to_string(),
    })
    .await;
    match sub
        .wait_for(|e| matches!(e, ServerEvent::Error { .. }))
        .await
    {
        ServerEvent::Error { code, .. } => assert_eq!(code, ErrorCode::PlayerNotFound),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn out_of_range_rankings_are_rejected() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("JKLM"), "H", Some(&no_timer_patch(3)))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("JKLM").unwrap();
    let mut sub = TestSubscriber::attach_identified(&room, h).await;
    room.start(h).await.unwrap();

    sub.send(ClientMessage::SubmitItem {
        text: "thing".to_string(),
    })
    .await;
    let item = match sub
        .wait_for(|e| matches!(e, ServerEvent::ItemSubmitted { .. }))
        .await
    {
        ServerEvent::ItemSubmitted { item } => item,
        _ => unreachable!(),
    };

    for bad in [0, 4] {
        sub.send(ClientMessage::RankItem {
            item_id: item.id,
            ranking: bad,
        })
        .await;
        match sub
            .wait_for(|e| matches!(e, ServerEvent::Error { .. }))
            .await
        {
            ServerEvent::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidRanking),
            _ => unreachable!(),
        }
    }
}

#[tokio::test]
async fn duplicate_nickname_join_is_rejected() {
    let registry = create_test_registry();
    registry
        .create_room(Some("MNPQ"), "Casey", Some(&no_timer_patch(5)))
        .unwrap();
    let room = registry.get("MNPQ").unwrap();

    let err = room.join("  casey ".to_string()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NicknameTaken);
}

#[tokio::test]
async fn skip_turn_advances_without_an_item() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("RSTV"), "H", Some(&no_timer_patch(5)))
        .unwrap();
    let h = created.player_id;
    let room = registry.get("RSTV").unwrap();
    let g = room.join("G".to_string()).await.unwrap().player_id;

    let mut sub_h = TestSubscriber::attach_identified(&room, h).await;
    let _sub_g = TestSubscriber::attach_identified(&room, g).await;
    room.start(h).await.unwrap();

    sub_h.send(ClientMessage::SkipTurn).await;
    match sub_h
        .wait_for(|e| matches!(e, ServerEvent::TurnChanged { .. }))
        .await
    {
        ServerEvent::TurnChanged { player_id, .. } => assert_eq!(player_id, g),
        _ => unreachable!(),
    }
    assert!(room.snapshot().await.unwrap().room.items.is_empty());
}

#[tokio::test]
async fn config_update_broadcasts_merged_options() {
    let registry = create_test_registry();
    let created = registry
        .create_room(Some("VWXY"), "H", None)
        .unwrap();
    let h = created.player_id;
    let room = registry.get("VWXY").unwrap();
    let mut sub = TestSubscriber::attach_identified(&room, h).await;

    sub.send(ClientMessage::UpdateConfig {
        config: RoomOptionsPatch {
            items_per_game: Some(4),
            timer_enabled: Some(false),
            ..RoomOptionsPatch::default()
        },
    })
    .await;
    match sub
        .wait_for(|e| matches!(e, ServerEvent::ConfigUpdated { .. }))
        .await
    {
        ServerEvent::ConfigUpdated { config } => {
            assert_eq!(config.items_per_game, 4);
            assert!(!config.timer_enabled);
        }
        _ => unreachable!(),
    }
}
