//! The pre-registered template catalog
//!
//! Names and parameter positions must match the templates registered with
//! the messaging provider.

/// `{{1}}` = FIR number
pub const REMINDER_TEMPLATE: &str = "investigation_reminder_30";
/// `{{1}}` = FIR number
pub const CRITICAL_TEMPLATE: &str = "investigation_critical_60";
/// `{{1}}` = FIR number, `{{2}}` = days elapsed
pub const OVERDUE_TEMPLATE: &str = "investigation_overdue";

const SIGNATURE: &str = "Crime Investigation Dashboard";

/// Render the text an officer would see for a template. Used by the
/// simulating gateway only; the real provider renders its own copy.
pub fn render_preview(template_id: &str, parameters: &[String]) -> String {
    let param = |i: usize| parameters.get(i).map(String::as_str).unwrap_or("?");

    match template_id {
        REMINDER_TEMPLATE => format!(
            "Investigation Reminder\n\n\
             FIR {fir} Investigation Status\n\n\
             Your investigation has been pending for 30 days.\n\
             Please provide an update or closure status.\n\n\
             Action Required:\n\
             - Update investigation status\n\
             - Submit pending reports\n\
             - Upload evidence if applicable\n\n\
             {SIGNATURE}",
            fir = param(0),
        ),
        CRITICAL_TEMPLATE => format!(
            "CRITICAL: Investigation Overdue\n\n\
             FIR {fir} - Investigation Status CRITICAL\n\n\
             Your investigation has reached 60 days.\n\
             Immediate action required.\n\n\
             URGENT Actions Needed:\n\
             1. Finalize investigation immediately\n\
             2. Submit final report to court\n\
             3. Upload all evidence to e-Sakshi\n\
             4. Schedule court appearance\n\n\
             Contact: Your Supervisor / Station Head\n\n\
             {SIGNATURE}",
            fir = param(0),
        ),
        OVERDUE_TEMPLATE => format!(
            "OVERDUE: Investigation Severely Delayed\n\n\
             FIR {fir} - {days} Days Elapsed\n\n\
             Your investigation is severely overdue.\n\
             IMMEDIATE ESCALATION REQUIRED\n\n\
             MANDATORY ACTIONS:\n\
             1. Report to Station Head IMMEDIATELY\n\
             2. File status report with Court\n\
             3. Complete investigation within 7 days\n\
             4. Upload all evidence to e-Sakshi\n\
             5. Prepare for judicial questioning\n\n\
             Contact your Police Station immediately.\n\n\
             {SIGNATURE}",
            fir = param(0),
            days = param(1),
        ),
        other => format!("Template: {}\nParameters: {}", other, parameters.join(", ")),
    }
}
