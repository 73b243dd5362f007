//! Card PIN changes (`--card-edit`, `passwd`)

use super::{Step, Workflow};
use crate::models::Secret;

/// Admin menu entry for changing the admin PIN
const MENU_CHANGE_ADMIN_PIN: &str = "3";

/// Admin menu entry that leaves the PIN menu
const MENU_QUIT: &str = "Q";

fn card_present() -> Step {
    Step::banner("Application ID")
}

fn old_and_new(old_pin: &Secret, new_pin: &Secret) -> [Step; 3] {
    [
        Step::exchange_secret("passphrase.enter", old_pin),
        Step::exchange_secret("passphrase.enter", new_pin),
        Step::exchange_secret("passphrase.enter", new_pin),
    ]
}

/// Change the card's user PIN from `old_pin` to `new_pin`
pub fn change_user_pin(old_pin: &Secret, new_pin: &Secret) -> Workflow {
    let mut steps = vec![card_present(), Step::exchange("cardedit.prompt", "passwd")];
    steps.extend(old_and_new(old_pin, new_pin));
    steps.extend([
        Step::milestone("PIN changed."),
        Step::exchange("cardedit.prompt", "quit"),
        Step::AwaitExit,
    ]);

    Workflow::new("user PIN change", vec!["--card-edit".to_string()], steps)
}

/// Change the card's admin PIN from `old_pin` to `new_pin`
pub fn change_admin_pin(old_pin: &Secret, new_pin: &Secret) -> Workflow {
    let mut steps = vec![
        card_present(),
        Step::exchange("cardedit.prompt", "admin"),
        Step::banner("Admin commands are allowed"),
        Step::exchange("cardedit.prompt", "passwd"),
        Step::banner("3 - change Admin PIN"),
        Step::exchange("cardutil.change_pin.menu", MENU_CHANGE_ADMIN_PIN),
    ];
    steps.extend(old_and_new(old_pin, new_pin));
    steps.extend([
        Step::milestone("PIN changed."),
        Step::exchange("cardutil.change_pin.menu", MENU_QUIT),
        Step::exchange("cardedit.prompt", "quit"),
        Step::AwaitExit,
    ]);

    Workflow::new("admin PIN change", vec!["--card-edit".to_string()], steps)
}
