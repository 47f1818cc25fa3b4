//! Repository Integration Tests
//!
//! Tests for the board, list and card repositories with in-memory SQLite.

#[cfg(test)]
mod tests {
    use crate::domain::{Board, Card, DomainError, List, PositionUpdate};
    use crate::repository::{
        init_db, BoardRepository, Repository, SiblingHierarchyOperations,
        SiblingPositioningOperations, SiblingRepository,
    };
    use std::path::Path;

    struct Repos {
        boards: BoardRepository,
        lists: SiblingRepository<List>,
        cards: SiblingRepository<Card>,
    }

    fn setup_test_db() -> Repos {
        let db_state = init_db(Path::new(":memory:")).expect("Failed to init test DB");
        Repos {
            boards: BoardRepository::new(db_state.connection()),
            lists: SiblingRepository::new(db_state.connection()),
            cards: SiblingRepository::new(db_state.connection()),
        }
    }

    /// Board with one list holding cards titled `titles`
    async fn seed(repos: &Repos, titles: &[&str]) -> (Board, List, Vec<Card>) {
        let board = repos.boards.create(&Board::new("Board".to_string())).await.unwrap();
        let list = repos.lists.create(&List::new(board.id, "Todo".to_string())).await.unwrap();
        let mut cards = Vec::new();
        for title in titles {
            cards.push(repos.cards.create(&Card::new(list.id, title.to_string())).await.unwrap());
        }
        (board, list, cards)
    }

    fn titles(cards: &[Card]) -> Vec<&str> {
        cards.iter().map(|c| c.title.as_str()).collect()
    }

    fn positions(cards: &[Card]) -> Vec<u32> {
        cards.iter().map(|c| c.position).collect()
    }

    #[tokio::test]
    async fn test_create_appends_in_order() {
        let repos = setup_test_db();
        let (_, list, cards) = seed(&repos, &["A", "B", "C"]).await;

        assert!(cards[0].id > 0);
        assert_eq!(positions(&cards), vec![1, 2, 3]);

        let children = repos.cards.children(list.id).await.unwrap();
        assert_eq!(titles(&children), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_create_at_position_shifts_siblings() {
        let repos = setup_test_db();
        let (_, list, _) = seed(&repos, &["A", "B"]).await;

        let inserted = repos
            .cards
            .create(&Card::new(list.id, "first".to_string()).at(1))
            .await
            .unwrap();
        assert_eq!(inserted.position, 1);

        let children = repos.cards.children(list.id).await.unwrap();
        assert_eq!(titles(&children), vec!["first", "A", "B"]);
        assert_eq!(positions(&children), vec![1, 2, 3]);

        // Past the end is clamped to the end
        let last = repos
            .cards
            .create(&Card::new(list.id, "last".to_string()).at(40))
            .await
            .unwrap();
        assert_eq!(last.position, 4);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let repos = setup_test_db();

        let err = repos.lists.create(&List::new(99, "Orphan".to_string())).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        let board = repos.boards.create(&Board::new("B".to_string())).await.unwrap();
        let err = repos.lists.create(&List::new(board.id, "  ".to_string())).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_leaves_gap() {
        let repos = setup_test_db();
        let (_, list, cards) = seed(&repos, &["A", "B", "C"]).await;

        repos.cards.delete(cards[1].id).await.unwrap();

        let children = repos.cards.children(list.id).await.unwrap();
        assert_eq!(titles(&children), vec!["A", "C"]);
        assert_eq!(positions(&children), vec![1, 3]);

        let err = repos.cards.delete(cards[1].id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let repos = setup_test_db();
        let (board, list, cards) = seed(&repos, &["A", "B"]).await;

        repos.lists.delete(list.id).await.unwrap();
        assert_eq!(repos.cards.find_by_id(cards[0].id).await.unwrap(), None);

        let other = repos.lists.create(&List::new(board.id, "Doing".to_string())).await.unwrap();
        repos.boards.delete(board.id).await.unwrap();
        assert_eq!(repos.lists.find_by_id(other.id).await.unwrap(), None);
        assert!(repos.lists.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_set_positions_is_idempotent() {
        let repos = setup_test_db();
        let (_, list, cards) = seed(&repos, &["A", "B", "C"]).await;

        let payload = vec![
            PositionUpdate { id: cards[2].id, position: 1 },
            PositionUpdate { id: cards[0].id, position: 2 },
            PositionUpdate { id: cards[1].id, position: 3 },
        ];
        let first = repos.cards.bulk_set_positions(list.id, &payload).await.unwrap();
        assert_eq!(titles(&first), vec!["C", "A", "B"]);
        assert_eq!(positions(&first), vec![1, 2, 3]);

        let second = repos.cards.bulk_set_positions(list.id, &payload).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_bulk_set_closes_gaps() {
        let repos = setup_test_db();
        let (_, list, cards) = seed(&repos, &["A", "B", "C"]).await;
        repos.cards.delete(cards[1].id).await.unwrap();

        let payload = vec![
            PositionUpdate { id: cards[0].id, position: 1 },
            PositionUpdate { id: cards[2].id, position: 2 },
        ];
        let result = repos.cards.bulk_set_positions(list.id, &payload).await.unwrap();
        assert_eq!(positions(&result), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_bulk_set_rejects_foreign_ids() {
        let repos = setup_test_db();
        let (board, list, cards) = seed(&repos, &["A", "B"]).await;
        let other = repos.lists.create(&List::new(board.id, "Done".to_string())).await.unwrap();
        let stranger = repos.cards.create(&Card::new(other.id, "X".to_string())).await.unwrap();

        let payload = vec![
            PositionUpdate { id: cards[1].id, position: 1 },
            PositionUpdate { id: stranger.id, position: 2 },
        ];
        let err = repos.cards.bulk_set_positions(list.id, &payload).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Nothing from the failed batch was kept
        let children = repos.cards.children(list.id).await.unwrap();
        assert_eq!(titles(&children), vec!["A", "B"]);

        let zero = vec![PositionUpdate { id: cards[0].id, position: 0 }];
        let err = repos.cards.bulk_set_positions(list.id, &zero).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_move_across_keeps_both_sides_contiguous() {
        let repos = setup_test_db();
        let (board, source, cards) = seed(&repos, &["A", "B", "C"]).await;
        let dest = repos.lists.create(&List::new(board.id, "Done".to_string())).await.unwrap();
        repos.cards.create(&Card::new(dest.id, "D".to_string())).await.unwrap();

        let moved = repos.cards.move_to(cards[0].id, source.id, dest.id, 1).await.unwrap();
        assert_eq!(moved.list_id, dest.id);
        assert_eq!(moved.position, 1);

        let left = repos.cards.children(source.id).await.unwrap();
        let right = repos.cards.children(dest.id).await.unwrap();
        assert_eq!(titles(&left), vec!["B", "C"]);
        assert_eq!(positions(&left), vec![1, 2]);
        assert_eq!(titles(&right), vec!["A", "D"]);
        assert_eq!(positions(&right), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_move_within_parent() {
        let repos = setup_test_db();
        let (_, list, cards) = seed(&repos, &["A", "B", "C"]).await;

        repos.cards.move_to(cards[0].id, list.id, list.id, 3).await.unwrap();
        let children = repos.cards.children(list.id).await.unwrap();
        assert_eq!(titles(&children), vec!["B", "C", "A"]);
        assert_eq!(positions(&children), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_move_from_wrong_parent_conflicts() {
        let repos = setup_test_db();
        let (board, list, cards) = seed(&repos, &["A"]).await;
        let other = repos.lists.create(&List::new(board.id, "Other".to_string())).await.unwrap();

        let err = repos.cards.move_to(cards[0].id, other.id, list.id, 1).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let err = repos.cards.move_to(cards[0].id, list.id, 999, 1).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_card() {
        let repos = setup_test_db();
        let (_, _, cards) = seed(&repos, &["A"]).await;

        let mut card = cards[0].clone();
        card.title = "Renamed".to_string();
        card.description = Some("details".to_string());
        let updated = repos.cards.update(&card).await.unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.description.as_deref(), Some("details"));
        assert_eq!(updated.position, 1);
    }

    #[tokio::test]
    async fn test_list_reindex_by_board() {
        let repos = setup_test_db();
        let board = repos.boards.create(&Board::new("B".to_string())).await.unwrap();
        for title in ["one", "two", "three"] {
            repos.lists.create(&List::new(board.id, title.to_string())).await.unwrap();
        }
        let lists = repos.lists.children(board.id).await.unwrap();
        repos.lists.delete(lists[0].id).await.unwrap();

        repos.lists.reindex(board.id).await.unwrap();
        let lists = repos.lists.children(board.id).await.unwrap();
        let ranks: Vec<u32> = lists.iter().map(|l| l.position).collect();
        assert_eq!(ranks, vec![1, 2]);
        assert_eq!(repos.lists.next_position(board.id).await.unwrap(), 3);
    }
}
