// ==========================================
// 指派向导端到端测试
// ==========================================
// 测试目标: 状态机走向、默认候选口径、编辑校验、结果过滤域
// ==========================================


use shipment_autoassign::api::{ApiError, WizardStartForm};
use shipment_autoassign::domain::{ShipmentState, WizardStep};
use shipment_autoassign::logging;
use test_helpers::*;

#[test]
fn test_default_candidates_warehouse_and_strict_cutoff() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let wh1 = seed_warehouse(&env, "WH1", "中心仓").unwrap();
    let wh2 = seed_warehouse(&env, "WH2", "东部仓").unwrap();

    // A: 命中; B: 创建时间恰好等于截止时刻(边界排除); C: 其他仓库; D: 非等待
    seed_shipment(&env, "A", &wh1.warehouse_id, &wh1.customer_id,
        ShipmentState::Waiting, "2024-01-01 10:00:00").unwrap();
    seed_shipment(&env, "B", &wh1.warehouse_id, &wh1.customer_id,
        ShipmentState::Waiting, "2024-01-01 00:00:00").unwrap();
    seed_shipment(&env, "C", &wh2.warehouse_id, &wh2.customer_id,
        ShipmentState::Waiting, "2024-01-01 10:00:00").unwrap();
    seed_shipment(&env, "D", &wh1.warehouse_id, &wh1.customer_id,
        ShipmentState::Draft, "2024-01-01 10:00:00").unwrap();

    let now = dt("2024-01-02 09:00:00");
    let session_id = env.wizard_api.start(now).expect("start 应该成功");

    let form = WizardStartForm {
        warehouse_id: Some(wh1.warehouse_id.clone()),
        from_datetime: Some(dt("2024-01-01 00:00:00")),
    };
    let candidates = env
        .wizard_api
        .submit_start(&session_id, &form, now)
        .expect("submit_start 应该成功");

    let ids: Vec<&str> = candidates.iter().map(|c| c.shipment_id.as_str()).collect();
    assert_eq!(ids, vec!["A"]);

    let session = env.wizard_api.get_session(&session_id, now).unwrap();
    assert_eq!(session.step, WizardStep::Shipments);
    assert_eq!(session.candidate_ids, vec!["A".to_string()]);
}

#[test]
fn test_blank_form_applies_no_constraints() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let wh1 = seed_warehouse(&env, "WH1", "中心仓").unwrap();
    let wh2 = seed_warehouse(&env, "WH2", "东部仓").unwrap();

    seed_shipment(&env, "A", &wh1.warehouse_id, &wh1.customer_id,
        ShipmentState::Waiting, "2024-01-01 10:00:00").unwrap();
    seed_shipment(&env, "B", &wh2.warehouse_id, &wh2.customer_id,
        ShipmentState::Waiting, "2024-01-01 11:00:00").unwrap();

    let now = dt("2024-01-02 09:00:00");
    let session_id = env.wizard_api.start(now).unwrap();
    let candidates = env
        .wizard_api
        .submit_start(&session_id, &WizardStartForm::default(), now)
        .unwrap();
    assert_eq!(candidates.len(), 2);
}

#[test]
fn test_assign_result_domain_is_exactly_the_successful_subset() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let topo = seed_base_topology(&env).unwrap();
    seed_product(&env, "P1").unwrap();
    seed_product(&env, "P2").unwrap();

    // 只有 P1 有货: A 可完整指派, E 不能
    seed_stock_arrival(&env, "ARR1", &topo, "P1", 10.0, "2024-01-01 06:00:00").unwrap();
    seed_shipment(&env, "A", &topo.warehouse_id, &topo.customer_id,
        ShipmentState::Waiting, "2024-01-01 10:00:00").unwrap();
    seed_demand_move(&env, "MA", "A", &topo, "P1", 3.0, "2024-01-01 10:00:00").unwrap();
    seed_shipment(&env, "E", &topo.warehouse_id, &topo.customer_id,
        ShipmentState::Waiting, "2024-01-01 10:00:00").unwrap();
    seed_demand_move(&env, "ME", "E", &topo, "P2", 3.0, "2024-01-01 10:00:00").unwrap();

    let now = dt("2024-01-02 09:00:00");
    let session_id = env.wizard_api.start(now).unwrap();
    env.wizard_api
        .submit_start(&session_id, &WizardStartForm::default(), now)
        .unwrap();
    env.wizard_api
        .set_shipments(&session_id, &["A".to_string(), "E".to_string()], now)
        .unwrap();

    let action = env.wizard_api.assign(&session_id, now).expect("assign 应该成功");
    assert_eq!(action.shipment_ids, vec!["A".to_string()]);

    assert_eq!(
        env.shipment_repo.find_by_id("A").unwrap().unwrap().state,
        ShipmentState::Assigned
    );
    assert_eq!(
        env.shipment_repo.find_by_id("E").unwrap().unwrap().state,
        ShipmentState::Waiting
    );

    let session = env.wizard_api.get_session(&session_id, now).unwrap();
    assert_eq!(session.step, WizardStep::Done);
}

#[test]
fn test_set_shipments_validation() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    let topo = seed_base_topology(&env).unwrap();

    seed_shipment(&env, "A", &topo.warehouse_id, &topo.customer_id,
        ShipmentState::Waiting, "2024-01-01 10:00:00").unwrap();
    seed_shipment(&env, "D", &topo.warehouse_id, &topo.customer_id,
        ShipmentState::Draft, "2024-01-01 10:00:00").unwrap();

    let now = dt("2024-01-02 09:00:00");
    let session_id = env.wizard_api.start(now).unwrap();
    env.wizard_api
        .submit_start(&session_id, &WizardStartForm::default(), now)
        .unwrap();

    // 编辑后的集合必须非空
    let result = env.wizard_api.set_shipments(&session_id, &[], now);
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    // 不存在的出库单
    let result = env
        .wizard_api
        .set_shipments(&session_id, &["NO-SUCH".to_string()], now);
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    // 非等待状态的出库单
    let result = env
        .wizard_api
        .set_shipments(&session_id, &["D".to_string()], now);
    assert!(matches!(result, Err(ApiError::BusinessRuleViolation(_))));

    // 合法集合
    env.wizard_api
        .set_shipments(&session_id, &["A".to_string()], now)
        .expect("合法集合应该通过");
}

#[test]
fn test_wizard_step_machine_enforcement() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    seed_base_topology(&env).unwrap();

    let now = dt("2024-01-02 09:00:00");
    let session_id = env.wizard_api.start(now).unwrap();

    // START 步骤不允许直接确认
    let result = env.wizard_api.assign(&session_id, now);
    assert!(matches!(
        result,
        Err(ApiError::InvalidStateTransition { .. })
    ));

    env.wizard_api
        .submit_start(&session_id, &WizardStartForm::default(), now)
        .unwrap();

    // SHIPMENTS 步骤不允许再次提交第一步
    let result = env
        .wizard_api
        .submit_start(&session_id, &WizardStartForm::default(), now);
    assert!(matches!(
        result,
        Err(ApiError::InvalidStateTransition { .. })
    ));

    // 候选为空时确认被拒绝
    let result = env.wizard_api.assign(&session_id, now);
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));

    // 取消后进入终态，不再接受任何操作
    env.wizard_api.cancel(&session_id, now).unwrap();
    let session = env.wizard_api.get_session(&session_id, now).unwrap();
    assert_eq!(session.step, WizardStep::Cancelled);
    let result = env.wizard_api.cancel(&session_id, now);
    assert!(matches!(
        result,
        Err(ApiError::InvalidStateTransition { .. })
    ));
}

#[test]
fn test_session_expiry_and_cleanup() {
    logging::init_test();
    let env = setup().expect("测试环境初始化失败");
    seed_base_topology(&env).unwrap();

    // TTL 配成 0 小时: 会话一创建即过期
    env.config
        .set_global_config_value("wizard_session_ttl_hours", "0")
        .unwrap();

    let now = dt("2024-01-02 09:00:00");
    let session_id = env.wizard_api.start(now).unwrap();

    let result = env
        .wizard_api
        .submit_start(&session_id, &WizardStartForm::default(), now);
    assert!(matches!(result, Err(ApiError::NotFound(_))));

    let removed = env.wizard_api.cleanup_expired(now).unwrap();
    assert_eq!(removed, 1);
    assert!(env.session_repo.find_by_id(&session_id).unwrap().is_none());
}
