//! Synthesis of artifact bodies from a template definition.
//!
//! Bodies produced here still contain placeholders; they are rendered per
//! project later on.

use serde_yaml::{Mapping, Value};

use crate::error::TemplateResult;
use crate::manifest::{
    host_port_placeholder, version_placeholder, PortMapping, ProxyRoute, TemplateDefinition,
    VersionSlot,
};

pub const COMPOSE_FILE: &str = "docker-compose.yml";
pub const ENV_FILE: &str = ".env";
pub const PROXY_FILE: &str = "proxy/{{PROJECT_NAME}}.yml";

/// External network the reverse proxy listens on.
pub const PROXY_NETWORK: &str = "proxy";

fn token(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

fn str_value(s: impl Into<String>) -> Value {
    Value::String(s.into())
}

fn seq(items: impl IntoIterator<Item = String>) -> Value {
    Value::Sequence(items.into_iter().map(Value::String).collect())
}

/// Build the compose definition: the `dev` workspace service followed by the
/// template's own services, verbatim.
pub fn compose_body(
    def: &TemplateDefinition,
    slots: &[VersionSlot],
    ports: &[PortMapping],
) -> TemplateResult<String> {
    let mut build = Mapping::new();
    build.insert(
        str_value("context"),
        str_value(format!("{}/{}", token("OVERLAYS_DIR"), def.base_overlay)),
    );
    if !slots.is_empty() {
        let mut args = Mapping::new();
        for slot in slots {
            let placeholder = version_placeholder(&slot.name);
            args.insert(str_value(placeholder.clone()), str_value(token(&placeholder)));
        }
        build.insert(str_value("args"), Value::Mapping(args));
    }

    let mut dev = Mapping::new();
    dev.insert(str_value("build"), Value::Mapping(build));
    dev.insert(
        str_value("container_name"),
        str_value(format!("{}-dev", token("PROJECT_NAME"))),
    );
    dev.insert(str_value("restart"), str_value("unless-stopped"));
    dev.insert(str_value("env_file"), seq([ENV_FILE.to_string()]));
    dev.insert(str_value("volumes"), seq([".:/workspace".to_string()]));
    dev.insert(str_value("working_dir"), str_value("/workspace"));
    if !ports.is_empty() {
        dev.insert(
            str_value("ports"),
            seq(ports.iter().map(|p| {
                format!("{}:{}", token(&host_port_placeholder(p.container)), p.container)
            })),
        );
    }
    let mut networks = vec!["default".to_string()];
    if def.proxy.is_some() {
        networks.push(PROXY_NETWORK.to_string());
    }
    dev.insert(str_value("networks"), seq(networks));

    let mut services = Mapping::new();
    services.insert(str_value("dev"), Value::Mapping(dev));
    for (name, service) in &def.services {
        services.insert(name.clone(), service.clone());
    }

    let mut root = Mapping::new();
    root.insert(str_value("name"), str_value(token("PROJECT_NAME")));
    root.insert(str_value("services"), Value::Mapping(services));

    if def.proxy.is_some() {
        let mut external = Mapping::new();
        external.insert(str_value("external"), Value::Bool(true));
        let mut networks = Mapping::new();
        networks.insert(str_value(PROXY_NETWORK), Value::Mapping(external));
        root.insert(str_value("networks"), Value::Mapping(networks));
    }

    if !def.volumes.is_empty() {
        let mut volumes = Mapping::new();
        for volume in &def.volumes {
            volumes.insert(str_value(volume.clone()), Value::Mapping(Mapping::new()));
        }
        root.insert(str_value("volumes"), Value::Mapping(volumes));
    }

    Ok(serde_yaml::to_string(&Value::Mapping(root))?)
}

/// Build the environment file, one `KEY=value` line per entry.
pub fn env_body(environment: &[(String, String)]) -> String {
    let mut body = format!("# Environment for {}\n", token("PROJECT_NAME"));
    for (key, value) in environment {
        body.push_str(key);
        body.push('=');
        body.push_str(value);
        body.push('\n');
    }
    body
}

/// Build the reverse-proxy route forwarding `{{DOMAIN}}` to the dev service.
pub fn proxy_body(route: ProxyRoute) -> TemplateResult<String> {
    let project = token("PROJECT_NAME");

    let mut tls = Mapping::new();
    tls.insert(str_value("certResolver"), str_value("letsencrypt"));

    let mut router = Mapping::new();
    router.insert(
        str_value("rule"),
        str_value(format!("Host(`{}`)", token("DOMAIN"))),
    );
    router.insert(str_value("entryPoints"), seq(["websecure".to_string()]));
    router.insert(str_value("service"), str_value(project.clone()));
    router.insert(str_value("tls"), Value::Mapping(tls));

    let mut server = Mapping::new();
    server.insert(
        str_value("url"),
        str_value(format!("http://{}-dev:{}", project, route.port)),
    );
    let mut balancer = Mapping::new();
    balancer.insert(
        str_value("servers"),
        Value::Sequence(vec![Value::Mapping(server)]),
    );
    let mut service = Mapping::new();
    service.insert(str_value("loadBalancer"), Value::Mapping(balancer));

    let mut routers = Mapping::new();
    routers.insert(str_value(project.clone()), Value::Mapping(router));
    let mut services = Mapping::new();
    services.insert(str_value(project), Value::Mapping(service));

    let mut http = Mapping::new();
    http.insert(str_value("routers"), Value::Mapping(routers));
    http.insert(str_value("services"), Value::Mapping(services));

    let mut root = Mapping::new();
    root.insert(str_value("http"), Value::Mapping(http));
    Ok(serde_yaml::to_string(&Value::Mapping(root))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scan_placeholders;

    fn definition(yaml: &str) -> TemplateDefinition {
        TemplateDefinition::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_compose_body_structure() {
        let def = definition(
            r#"
name: demo
description: Demo
base_overlay: php
proxy:
  port: 8000
services:
  db:
    image: "mysql:{{MYSQL_VERSION}}"
volumes: [db_data]
"#,
        );
        let slots = vec![VersionSlot {
            name: "php".into(),
            default: "8.2".into(),
        }];
        let ports = vec![PortMapping {
            host: 8000,
            container: 8000,
        }];
        let body = compose_body(&def, &slots, &ports).unwrap();

        let parsed: Value = serde_yaml::from_str(&body).unwrap();
        assert_eq!(parsed["name"], str_value("{{PROJECT_NAME}}"));
        assert_eq!(
            parsed["services"]["dev"]["build"]["context"],
            str_value("{{OVERLAYS_DIR}}/php")
        );
        assert_eq!(
            parsed["services"]["dev"]["build"]["args"]["PHP_VERSION"],
            str_value("{{PHP_VERSION}}")
        );
        assert_eq!(
            parsed["services"]["dev"]["ports"][0],
            str_value("{{HOST_PORT_8000}}:8000")
        );
        assert_eq!(parsed["services"]["db"]["image"], str_value("mysql:{{MYSQL_VERSION}}"));
        assert_eq!(parsed["networks"]["proxy"]["external"], Value::Bool(true));
        assert!(parsed["volumes"]["db_data"].is_mapping());

        let names = scan_placeholders(&body).unwrap();
        assert!(names.contains("MYSQL_VERSION"));
        assert!(names.contains("HOST_PORT_8000"));
    }

    #[test]
    fn test_env_body_keeps_order() {
        let body = env_body(&[
            ("B".to_string(), "2".to_string()),
            ("A".to_string(), "{{PROJECT_NAME}}".to_string()),
        ]);
        assert_eq!(body, "# Environment for {{PROJECT_NAME}}\nB=2\nA={{PROJECT_NAME}}\n");
    }

    #[test]
    fn test_proxy_body() {
        let body = proxy_body(ProxyRoute { port: 8080 }).unwrap();
        let parsed: Value = serde_yaml::from_str(&body).unwrap();

        let router = &parsed["http"]["routers"]["{{PROJECT_NAME}}"];
        assert_eq!(router["rule"], str_value("Host(`{{DOMAIN}}`)"));
        assert_eq!(router["service"], str_value("{{PROJECT_NAME}}"));
        assert_eq!(
            parsed["http"]["services"]["{{PROJECT_NAME}}"]["loadBalancer"]["servers"][0]["url"],
            str_value("http://{{PROJECT_NAME}}-dev:8080")
        );
        assert!(scan_placeholders(&body).is_ok());
    }
}
