use crate::api::v1alpha1::DeploymentCondition;

/// Finds the condition_type in conditions.
pub fn find_status_condition<'a>(
    conditions: &'a [DeploymentCondition],
    condition_type: &str,
) -> Option<&'a DeploymentCondition> {
    conditions
        .iter()
        .find(|condition| condition.type_ == condition_type)
}

/// Returns true when the condition_type is present and set to `True`
pub fn is_status_condition_true(conditions: &[DeploymentCondition], condition_type: &str) -> bool {
    is_status_condition_present_and_equal(conditions, condition_type, "True")
}

/// Returns true when the condition_type is present and set to `False`
pub fn is_status_condition_false(conditions: &[DeploymentCondition], condition_type: &str) -> bool {
    is_status_condition_present_and_equal(conditions, condition_type, "False")
}

/// Returns true when condition_type is present and equal to status.
pub fn is_status_condition_present_and_equal(
    conditions: &[DeploymentCondition],
    condition_type: &str,
    status: &str,
) -> bool {
    conditions
        .iter()
        .any(|condition| condition.type_ == condition_type && condition.status == status)
}
