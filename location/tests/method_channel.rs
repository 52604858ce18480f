mod common;

use common::{Call, FakePlatform, raw_fix};
use geobridge_location::{
    Accuracy, LocationBridge, MethodCall, MethodResult, Priority, SettingsOutcome,
    SettingsPurpose,
};
use serde_json::{Value, json};

fn call(method: &str, arguments: Value) -> MethodCall {
    MethodCall::new(method, arguments)
}

#[tokio::test]
async fn change_settings_accepts_every_accuracy() {
    let expected = [
        (0, Accuracy::PowerSave, Priority::NoPower),
        (1, Accuracy::Low, Priority::LowPower),
        (2, Accuracy::Balanced, Priority::BalancedPowerAccuracy),
        (3, Accuracy::High, Priority::HighAccuracy),
        (4, Accuracy::Navigation, Priority::HighAccuracy),
    ];

    let mut bridge = LocationBridge::new(FakePlatform::ready());
    for (ordinal, accuracy, priority) in expected {
        let result = bridge
            .handle_method_call(&call(
                "changeSettings",
                json!({ "accuracy": ordinal, "interval": 3000, "distanceFilter": 10.0 }),
            ))
            .await;
        assert_eq!(result, MethodResult::success(1));

        let settings = bridge.settings();
        assert_eq!(settings.accuracy(), accuracy);
        assert_eq!(settings.priority(), priority);
        assert_eq!(settings.interval_ms(), 3000);
        assert_eq!(settings.fastest_interval_ms(), 1500);
        assert_eq!(settings.distance_filter(), 10.0);
    }

    let configured = bridge
        .platform()
        .calls
        .iter()
        .filter(|call| matches!(call, Call::Configure(_)))
        .count();
    assert_eq!(configured, 5);
}

#[tokio::test]
async fn change_settings_rejects_malformed_arguments() {
    let mut bridge = LocationBridge::new(FakePlatform::ready());
    let before = bridge.settings().clone();

    for arguments in [
        Value::Null,
        json!({ "accuracy": 7, "interval": 1000, "distanceFilter": 0 }),
        json!({ "accuracy": 1, "interval": -5, "distanceFilter": 0 }),
        json!({ "accuracy": 1, "interval": 1000, "distanceFilter": -1.0 }),
        json!({ "accuracy": "high", "interval": 1000, "distanceFilter": 0 }),
    ] {
        let result = bridge
            .handle_method_call(&call("changeSettings", arguments))
            .await;
        assert!(
            matches!(&result, MethodResult::Error { code, .. } if code == "CHANGE_SETTINGS_ERROR"),
            "{result:?}"
        );
    }

    assert_eq!(bridge.settings(), &before);
}

#[tokio::test]
async fn change_settings_reports_platform_rejection() {
    let mut bridge = LocationBridge::new(FakePlatform {
        fail_configure: true,
        ..FakePlatform::ready()
    });
    let before = bridge.settings().clone();

    let result = bridge
        .handle_method_call(&call(
            "changeSettings",
            json!({ "accuracy": 1, "interval": 8000, "distanceFilter": 25.0 }),
        ))
        .await;

    assert_eq!(
        result,
        MethodResult::Error {
            code: "CHANGE_SETTINGS_ERROR".into(),
            message: "An unexpected error happened during location settings change: \
                      request rejected by provider"
                .into(),
        }
    );
    assert_eq!(bridge.settings(), &before);
    assert_eq!(bridge.settings().interval_ms(), 5000);
}

#[tokio::test]
async fn get_location_returns_the_fix_map() {
    let mut bridge = LocationBridge::new(FakePlatform::ready());
    let reply = bridge.handle_method_call(&call("getLocation", Value::Null));

    bridge
        .on_settings_checked(SettingsPurpose::Location, SettingsOutcome::Satisfied)
        .unwrap();
    bridge.on_location(&raw_fix(52.5, 13.4)).unwrap();

    assert_eq!(
        reply.await,
        MethodResult::success(json!({
            "latitude": 52.5,
            "longitude": 13.4,
            "accuracy": 4.0,
            "altitude": 120.0,
            "speed": 1.5,
            "speed_accuracy": 0.5,
            "heading": 90.0,
            "time": 1_700_000_000_000.0,
        }))
    );
}

#[tokio::test]
async fn permission_methods_report_flags() {
    let mut bridge = LocationBridge::new(FakePlatform::ready());
    assert_eq!(
        bridge.handle_method_call(&call("hasPermission", Value::Null)).await,
        MethodResult::success(1)
    );
    assert_eq!(
        bridge
            .handle_method_call(&call("requestPermission", Value::Null))
            .await,
        MethodResult::success(1)
    );

    let mut bridge = LocationBridge::new(FakePlatform {
        rationale: true,
        ..FakePlatform::default()
    });
    assert_eq!(
        bridge.handle_method_call(&call("hasPermission", Value::Null)).await,
        MethodResult::success(0)
    );
    let reply = bridge.handle_method_call(&call("requestPermission", Value::Null));
    bridge.on_permission_result(false).unwrap();
    assert_eq!(reply.await, MethodResult::success(0));

    let mut bridge = LocationBridge::new(FakePlatform::default());
    let reply = bridge.handle_method_call(&call("requestPermission", Value::Null));
    bridge.on_permission_result(false).unwrap();
    assert!(matches!(
        reply.await,
        MethodResult::Error { code, .. } if code == "PERMISSION_DENIED_NEVER_ASK"
    ));
}

#[tokio::test]
async fn service_methods_report_flags() {
    let mut bridge = LocationBridge::new(FakePlatform::default());
    assert_eq!(
        bridge
            .handle_method_call(&call("serviceEnabled", Value::Null))
            .await,
        MethodResult::success(0)
    );

    let reply = bridge.handle_method_call(&call("requestService", Value::Null));
    bridge
        .on_settings_checked(SettingsPurpose::Service, SettingsOutcome::Unavailable)
        .unwrap();
    assert!(matches!(
        reply.await,
        MethodResult::Error { code, .. } if code == "SERVICE_STATUS_DISABLED"
    ));

    bridge.platform_mut().gps = Ok(true);
    assert_eq!(
        bridge
            .handle_method_call(&call("serviceEnabled", Value::Null))
            .await,
        MethodResult::success(1)
    );
    assert_eq!(
        bridge
            .handle_method_call(&call("requestService", Value::Null))
            .await,
        MethodResult::success(1)
    );
}

#[tokio::test]
async fn unknown_methods_are_not_implemented() {
    let mut bridge = LocationBridge::new(FakePlatform::ready());
    assert_eq!(
        bridge
            .handle_method_call(&call("getAltitude", Value::Null))
            .await,
        MethodResult::NotImplemented
    );
    assert!(bridge.platform().calls.is_empty());
}
