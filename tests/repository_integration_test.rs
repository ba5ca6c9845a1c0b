// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 各仓储的查询口径与读写往返
// ==========================================


use shipment_autoassign::db;
use shipment_autoassign::domain::{
    CronTask, Location, LocationType, MoveState, ShipmentState, WizardSession, WizardStep,
};
use shipment_autoassign::logging;
use test_helpers::*;

#[test]
fn test_schema_version_is_seeded() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let conn = env.conn.lock().unwrap();
    let version = db::read_schema_version(&conn).unwrap();
    assert_eq!(version, Some(db::CURRENT_SCHEMA_VERSION));
}

#[test]
fn test_location_queries() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let topo = seed_base_topology(&env).unwrap();

    // 停用的存储区不参与查询
    env.location_repo
        .insert(&Location {
            location_id: "STO-DISABLED".to_string(),
            code: None,
            name: "停用存储区".to_string(),
            location_type: LocationType::Storage,
            parent_id: Some(topo.warehouse_id.clone()),
            active: false,
        })
        .unwrap();

    let storage = env.location_repo.find_storage_excluding("OUT").unwrap();
    let ids: Vec<&str> = storage.iter().map(|l| l.location_id.as_str()).collect();
    assert_eq!(ids, vec![topo.storage_id.as_str()]);

    let customers = env.location_repo.find_by_type(LocationType::Customer).unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].location_id, topo.customer_id);

    let by_name = env
        .location_repo
        .find_by_names(&["中心仓".to_string(), "不存在仓".to_string()])
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].location_id, topo.warehouse_id);

    assert!(env.location_repo.find_by_names(&[]).unwrap().is_empty());

    let loaded = env.location_repo.find_by_id(&topo.staging_id).unwrap().unwrap();
    assert_eq!(loaded.code.as_deref(), Some("OUT"));
    assert!(!loaded.is_pickable_storage());
}

#[test]
fn test_shipment_find_waiting_filters() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let wh1 = seed_warehouse(&env, "WH1", "中心仓").unwrap();
    let wh2 = seed_warehouse(&env, "WH2", "东部仓").unwrap();

    seed_shipment(&env, "A", &wh1.warehouse_id, &wh1.customer_id,
        ShipmentState::Waiting, "2024-01-01 10:00:00").unwrap();
    seed_shipment(&env, "B", &wh1.warehouse_id, &wh1.customer_id,
        ShipmentState::Waiting, "2024-01-01 00:00:00").unwrap();
    seed_shipment(&env, "C", &wh2.warehouse_id, &wh2.customer_id,
        ShipmentState::Waiting, "2024-01-02 00:00:00").unwrap();
    seed_shipment(&env, "D", &wh1.warehouse_id, &wh1.customer_id,
        ShipmentState::Assigned, "2024-01-01 10:00:00").unwrap();

    // 无过滤: 全部等待单
    let all = env.shipment_repo.find_waiting(None, None).unwrap();
    assert_eq!(all.len(), 3);

    // 仓库过滤
    let wh1_only = env
        .shipment_repo
        .find_waiting(Some(&wh1.warehouse_id), None)
        .unwrap();
    let ids: Vec<&str> = wh1_only.iter().map(|s| s.shipment_id.as_str()).collect();
    assert_eq!(ids, vec!["B", "A"]);

    // 截止时刻严格大于: 恰好等于者被排除
    let after = env
        .shipment_repo
        .find_waiting(Some(&wh1.warehouse_id), Some(dt("2024-01-01 00:00:00")))
        .unwrap();
    let ids: Vec<&str> = after.iter().map(|s| s.shipment_id.as_str()).collect();
    assert_eq!(ids, vec!["A"]);

    // find_by_ids 空集守卫
    assert!(env.shipment_repo.find_by_ids(&[]).unwrap().is_empty());
}

#[test]
fn test_move_arrival_and_demand_queries() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let topo = seed_base_topology(&env).unwrap();
    seed_product(&env, "P1").unwrap();
    seed_product(&env, "P2").unwrap();

    // P1 在窗口内到货两次（去重）; P2 在窗口外
    seed_stock_arrival(&env, "ARR1", &topo, "P1", 5.0, "2024-01-01 10:00:00").unwrap();
    seed_stock_arrival(&env, "ARR2", &topo, "P1", 5.0, "2024-01-01 11:00:00").unwrap();
    seed_stock_arrival(&env, "ARR3", &topo, "P2", 5.0, "2023-12-30 10:00:00").unwrap();

    let storage_ids = vec![topo.storage_id.clone()];
    let arrived = env
        .move_repo
        .products_arrived_since(dt("2024-01-01 00:00:00"), &storage_ids)
        .unwrap();
    assert_eq!(arrived, vec!["P1".to_string()]);

    // 空存储区列表 → 空结果（不产生非法 SQL）
    assert!(env
        .move_repo
        .products_arrived_since(dt("2024-01-01 00:00:00"), &[])
        .unwrap()
        .is_empty());

    // 草稿需求: 只认 DRAFT 且流向客户库位
    seed_shipment(&env, "S1", &topo.warehouse_id, &topo.customer_id,
        ShipmentState::Waiting, "2024-01-01 08:00:00").unwrap();
    seed_demand_move(&env, "M1", "S1", &topo, "P1", 2.0, "2024-01-01 08:00:00").unwrap();
    seed_move(&env, "M2", Some("S1"), "P1", &topo.storage_id, &topo.customer_id,
        1.0, MoveState::Done, "2024-01-01 08:10:00").unwrap();

    let customer_ids = vec![topo.customer_id.clone()];
    let demand = env
        .move_repo
        .find_draft_demand(&["P1".to_string()], &customer_ids)
        .unwrap();
    assert_eq!(demand.len(), 1);
    assert_eq!(demand[0].move_id, "M1");
    assert_eq!(demand[0].shipment_id.as_deref(), Some("S1"));

    assert!(env
        .move_repo
        .find_draft_demand(&[], &customer_ids)
        .unwrap()
        .is_empty());

    // 按出库单查询
    let draft_moves = env
        .move_repo
        .find_by_shipment("S1", Some(MoveState::Draft))
        .unwrap();
    assert_eq!(draft_moves.len(), 1);
    let all_moves = env.move_repo.find_by_shipment("S1", None).unwrap();
    assert_eq!(all_moves.len(), 2);
}

#[test]
fn test_cron_task_roundtrip() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");

    let task = CronTask {
        task_id: "job_x".to_string(),
        name: "测试任务".to_string(),
        interval_seconds: 600,
        next_call: dt("2024-01-02 00:00:00"),
        args_json: Some(r#"["中心仓","东部仓"]"#.to_string()),
        active: true,
        last_run_at: None,
        last_error: None,
    };
    env.cron_repo.upsert(&task).unwrap();

    let loaded = env.cron_repo.find_by_id("job_x").unwrap().unwrap();
    assert_eq!(loaded, task);
    assert_eq!(loaded.lookback_start(), dt("2024-01-01 23:50:00"));

    // find_due 以 next_call <= now 为准
    assert!(env
        .cron_repo
        .find_due(dt("2024-01-01 23:59:59"))
        .unwrap()
        .iter()
        .all(|t| t.task_id != "job_x"));
    assert!(env
        .cron_repo
        .find_due(dt("2024-01-02 00:00:00"))
        .unwrap()
        .iter()
        .any(|t| t.task_id == "job_x"));

    env.cron_repo
        .update_after_run(
            "job_x",
            dt("2024-01-02 00:10:00"),
            dt("2024-01-02 00:00:30"),
            Some("一次失败"),
        )
        .unwrap();
    let loaded = env.cron_repo.find_by_id("job_x").unwrap().unwrap();
    assert_eq!(loaded.next_call, dt("2024-01-02 00:10:00"));
    assert_eq!(loaded.last_run_at, Some(dt("2024-01-02 00:00:30")));
    assert_eq!(loaded.last_error.as_deref(), Some("一次失败"));

    let missing = env.cron_repo.update_after_run(
        "no-such",
        dt("2024-01-02 00:10:00"),
        dt("2024-01-02 00:00:30"),
        None,
    );
    assert!(missing.is_err());
}

#[test]
fn test_wizard_session_roundtrip_and_cleanup() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let topo = seed_base_topology(&env).unwrap();

    let mut session = WizardSession {
        session_id: "sess-1".to_string(),
        step: WizardStep::Start,
        warehouse_id: None,
        from_datetime: None,
        candidate_ids: Vec::new(),
        created_at: dt("2024-01-01 09:00:00"),
        expires_at: dt("2024-01-02 09:00:00"),
    };
    env.session_repo.insert(&session).unwrap();

    session.step = WizardStep::Shipments;
    session.warehouse_id = Some(topo.warehouse_id.clone());
    session.from_datetime = Some(dt("2024-01-01 00:00:00"));
    session.candidate_ids = vec!["A".to_string(), "B".to_string()];
    env.session_repo.update(&session).unwrap();

    let loaded = env.session_repo.find_by_id("sess-1").unwrap().unwrap();
    assert_eq!(loaded, session);

    // 只清理已过期会话
    let removed = env
        .session_repo
        .cleanup_expired(dt("2024-01-02 08:59:59"))
        .unwrap();
    assert_eq!(removed, 0);
    let removed = env
        .session_repo
        .cleanup_expired(dt("2024-01-02 09:00:00"))
        .unwrap();
    assert_eq!(removed, 1);
    assert!(env.session_repo.find_by_id("sess-1").unwrap().is_none());
}

#[test]
fn test_config_manager_defaults_and_overrides() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");

    // 缺省值
    assert_eq!(env.config.get_i64_or("no_such_key", 42).unwrap(), 42);
    assert_eq!(env.config.scheduler_poll_seconds().unwrap(), 30);

    // 覆写
    env.config
        .set_global_config_value("scheduler_poll_seconds", "5")
        .unwrap();
    assert_eq!(env.config.scheduler_poll_seconds().unwrap(), 5);

    // 非法取值回退默认
    env.config
        .set_global_config_value("scheduler_poll_seconds", "abc")
        .unwrap();
    assert_eq!(env.config.scheduler_poll_seconds().unwrap(), 30);
}
