use crate::support::print_json_or_exit;
use gtcheck_kernel::{ArgShape, try_parse_call};
use serde_json::json;

pub fn run(call: String, json_output: bool) {
    match try_parse_call(&call) {
        Ok(parsed) => {
            let args: Vec<_> = parsed.args.iter().map(ArgShape::to_json).collect();
            let method_name = parsed.method_name.unwrap_or_default();
            if json_output {
                let payload = json!({
                    "call": call,
                    "parsed": true,
                    "methodName": method_name,
                    "args": args,
                });
                print_json_or_exit(&payload, "parse-call");
            } else {
                println!("method: {method_name}");
                println!("args ({}):", args.len());
                for (index, arg) in args.iter().enumerate() {
                    println!("  [{index}] {arg}");
                }
            }
        }
        Err(error) => {
            if json_output {
                let payload = json!({
                    "call": call,
                    "parsed": false,
                    "methodName": null,
                    "args": [],
                    "error": error.to_string(),
                });
                print_json_or_exit(&payload, "parse-call");
            } else {
                eprintln!("error: not a call expression: {error}");
            }
            std::process::exit(1);
        }
    }
}
