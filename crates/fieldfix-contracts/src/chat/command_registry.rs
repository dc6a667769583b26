#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    /// Key the raw argument is stored under in `command_args`.
    pub arg_key: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "field",
        action: "set_field",
        arg_key: "field",
    },
    CommandSpec {
        command: "lang",
        action: "set_language",
        arg_key: "language",
    },
    CommandSpec {
        command: "model",
        action: "set_model",
        arg_key: "model",
    },
    CommandSpec {
        command: "open",
        action: "reopen",
        arg_key: "id",
    },
    CommandSpec {
        command: "bom",
        action: "bill_of_materials",
        arg_key: "id",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "attach",
    action: "attach_image",
    arg_key: "path",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "detach",
        action: "detach_image",
        arg_key: "",
    },
    CommandSpec {
        command: "toggle_lang",
        action: "toggle_language",
        arg_key: "",
    },
    CommandSpec {
        command: "history",
        action: "history",
        arg_key: "",
    },
    CommandSpec {
        command: "show",
        action: "show",
        arg_key: "",
    },
    CommandSpec {
        command: "help",
        action: "help",
        arg_key: "",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
        arg_key: "",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
        arg_key: "",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/field <mechanical|electrical|civil|chemical>",
    "/lang <en|sw>",
    "/toggle_lang",
    "/attach <image path>",
    "/detach",
    "/bom [record id]",
    "/history",
    "/open <record id>",
    "/show",
    "/model <name>",
    "/help",
    "/quit",
];
