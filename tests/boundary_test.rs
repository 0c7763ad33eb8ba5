use tap_release::boundary::BoundaryWarning;
use tap_release::domain::{Reconciliation, SyncTrigger, Version, VersionBump};
use tap_release::ui;

// ============================================================================
// BoundaryWarning Display Tests
// ============================================================================

#[test]
fn test_boundary_warning_different_machine_display() {
    let display_msg = BoundaryWarning::DifferentMachine.to_string();
    assert!(
        display_msg.contains("Different machine"),
        "Message should mention the machine change, got: {}",
        display_msg
    );
}

#[test]
fn test_boundary_warning_tag_exists_display() {
    let warning = BoundaryWarning::ProposedTagExists {
        tag: "v1.2.4".to_string(),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("v1.2.4") && display_msg.contains("already exists"),
        "Message should name the existing tag, got: {}",
        display_msg
    );
}

#[test]
fn test_boundary_warning_rebased_display() {
    let warning = BoundaryWarning::RebasedOnRemote {
        lock: Version::new(1, 2, 3),
        remote: Version::new(1, 3, 0),
    };

    let display_msg = warning.to_string();
    assert!(
        display_msg.contains("v1.2.3") && display_msg.contains("v1.3.0"),
        "Message should show expected and actual versions, got: {}",
        display_msg
    );
}

#[test]
fn test_boundary_warning_lock_ahead_display() {
    let warning = BoundaryWarning::LockAheadOfRemote {
        local: Version::new(2, 0, 0),
        remote: Version::new(1, 9, 9),
    };

    let display_msg = warning.to_string();
    assert!(display_msg.contains("ahead"), "got: {}", display_msg);
    assert!(display_msg.contains("left unchanged"), "got: {}", display_msg);
}

// ============================================================================
// Warnings derived from a release plan
// ============================================================================

fn plan(triggers: Vec<SyncTrigger>, remote_latest: Option<Version>) -> Reconciliation {
    let current = Version::new(1, 2, 3);
    let baseline = remote_latest.map_or(current, |remote| remote.max(current));
    Reconciliation {
        current,
        baseline,
        proposed: baseline.bump(VersionBump::Patch).unwrap(),
        kind: VersionBump::Patch,
        triggers,
        remote_latest,
    }
}

#[test]
fn test_quiet_plan_has_no_warnings() {
    assert!(BoundaryWarning::for_plan(&plan(vec![], None)).is_empty());
}

#[test]
fn test_remote_ahead_plan_warnings() {
    let warnings = BoundaryWarning::for_plan(&plan(
        vec![
            SyncTrigger::DifferentMachine,
            SyncTrigger::TagExists("v1.2.4".to_string()),
        ],
        Some(Version::new(1, 3, 0)),
    ));

    assert_eq!(
        warnings,
        vec![
            BoundaryWarning::DifferentMachine,
            BoundaryWarning::ProposedTagExists {
                tag: "v1.2.4".to_string()
            },
            BoundaryWarning::RebasedOnRemote {
                lock: Version::new(1, 2, 3),
                remote: Version::new(1, 3, 0),
            },
        ]
    );
}

#[test]
fn test_remote_behind_lock_is_not_a_rebase() {
    let warnings = BoundaryWarning::for_plan(&plan(
        vec![SyncTrigger::DifferentMachine],
        Some(Version::new(1, 0, 0)),
    ));
    assert_eq!(warnings, vec![BoundaryWarning::DifferentMachine]);
}

// ============================================================================
// Boundary Warning Display Function Tests
// ============================================================================

#[test]
fn test_display_boundary_warning_function() {
    // Output goes to stderr; this only checks it does not panic
    ui::display_boundary_warning(&BoundaryWarning::DifferentMachine);
}

#[test]
fn test_formatted_warning_carries_message() {
    let warning = BoundaryWarning::ProposedTagExists {
        tag: "v0.1.0".to_string(),
    };
    let formatted = ui::formatter::format_boundary_warning(&warning);
    assert!(formatted.contains("WARNING"));
    assert!(formatted.contains("Tag v0.1.0 already exists"));
}
