#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use artifact_deriver::artifact::{Artifact, ArtifactKind};
use artifact_deriver::error::LinkResult;
use artifact_deriver::linker::{Criteria, LinkerContext};
use mockall::mock;
use tempfile::TempDir;
use uuid::Uuid;

/// WSDL whose part element resolves against its own embedded schema.
pub const ORDER_WSDL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
                  xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
                  xmlns:xsd="http://www.w3.org/2001/XMLSchema"
                  xmlns:tns="urn:x"
                  targetNamespace="urn:x">
  <wsdl:types>
    <xsd:schema targetNamespace="urn:x">
      <xsd:element name="ReqElem" type="xsd:string"/>
      <xsd:complexType name="Order">
        <xsd:sequence>
          <xsd:element name="localOnly" type="xsd:string"/>
        </xsd:sequence>
      </xsd:complexType>
    </xsd:schema>
  </wsdl:types>
  <wsdl:message name="Req">
    <wsdl:part name="body" element="tns:ReqElem"/>
  </wsdl:message>
  <wsdl:message name="Resp">
    <wsdl:part name="order" type="tns:Order"/>
  </wsdl:message>
  <wsdl:portType name="OrderPort">
    <wsdl:operation name="place">
      <wsdl:input message="tns:Req"/>
      <wsdl:output message="tns:Resp"/>
      <wsdl:fault name="rejected" message="tns:Rejected"/>
    </wsdl:operation>
  </wsdl:portType>
  <wsdl:binding name="OrderBinding" type="tns:OrderPort">
    <soap:binding style="document" transport="http://schemas.xmlsoap.org/soap/http"/>
    <wsdl:operation name="place">
      <wsdl:input/>
      <wsdl:output/>
    </wsdl:operation>
  </wsdl:binding>
  <wsdl:service name="OrderService">
    <wsdl:port name="OrderEndpoint" binding="tns:OrderBinding">
      <soap:address location="http://localhost/orders"/>
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>
"#;

/// WSDL whose operation input names a message defined in another document.
pub const REMOTE_MESSAGE_WSDL: &str = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
             xmlns:shared="urn:shared"
             targetNamespace="urn:client">
  <portType name="ClientPort">
    <operation name="send">
      <input message="shared:Envelope"/>
    </operation>
  </portType>
</definitions>
"#;

/// Binding, service and port without names.
pub const ANONYMOUS_WSDL: &str = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
             xmlns:tns="urn:anon"
             targetNamespace="urn:anon">
  <portType name="P">
    <operation name="op"/>
  </portType>
  <binding type="tns:P">
    <operation name="op"/>
  </binding>
  <service>
    <port/>
  </service>
</definitions>
"#;

pub const SHARED_XSD: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:shared">
  <xs:element name="Envelope" type="xs:string"/>
  <xs:element name="Header" type="xs:string"/>
  <xs:attribute name="version" type="xs:string"/>
  <xs:simpleType name="Code">
    <xs:restriction base="xs:string"/>
  </xs:simpleType>
  <xs:complexType name="Body">
    <xs:sequence>
      <xs:element name="nested" type="xs:string"/>
    </xs:sequence>
    <xs:attribute name="local" type="xs:string"/>
  </xs:complexType>
</xs:schema>
"#;

/// Schema importing `urn:shared` and including its own namespace.
pub const IMPORTING_XSD: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:app">
  <xs:import namespace="urn:shared" schemaLocation="shared.xsd"/>
  <xs:import namespace="urn:nowhere" schemaLocation="nowhere.xsd"/>
  <xs:element name="App" type="xs:string"/>
</xs:schema>
"#;

/// WSDL referencing the `urn:shared` schema from a part.
pub const SHARED_CLIENT_WSDL: &str = r#"<?xml version="1.0"?>
<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
             xmlns:shared="urn:shared"
             targetNamespace="urn:client">
  <message name="Call">
    <part name="envelope" element="shared:Envelope"/>
    <part name="ghost" element="shared:Ghost"/>
  </message>
</definitions>
"#;

pub const POLICY_XML: &str = r#"<?xml version="1.0"?>
<wsp:Policy xmlns:wsp="http://www.w3.org/ns/ws-policy">
  <wsp:ExactlyOne/>
</wsp:Policy>
"#;

pub const MALFORMED_XML: &str = "<definitions><message name=\"broken\"></definitions>";

/// Writes `files` into a fresh temporary directory.
pub fn document_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }
    dir
}

pub fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

pub fn path_in(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

pub fn find<'a>(artifacts: &'a [Artifact], name: &str) -> &'a Artifact {
    artifacts
        .iter()
        .find(|a| a.name == name)
        .unwrap_or_else(|| panic!("no artifact named {}", name))
}

/// A persisted-looking artifact with identity, namespace and local name.
pub fn stored(kind: ArtifactKind, namespace: &str, name: &str) -> Artifact {
    Artifact::new(kind, name)
        .with_uuid(Uuid::new_v4())
        .with_namespace(namespace)
        .with_nc_name(name)
}

/// One answered query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub model: String,
    pub artifact_type: String,
    pub criteria: Criteria,
}

/// `LinkerContext` over a fixed artifact set that records every query.
pub struct RecordingContext {
    artifacts: Vec<Artifact>,
    queries: Mutex<Vec<Query>>,
}

impl RecordingContext {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self {
            artifacts,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }
}

impl LinkerContext for RecordingContext {
    fn find_artifacts(
        &self,
        model: &str,
        artifact_type: &str,
        criteria: &Criteria,
    ) -> LinkResult<Vec<Artifact>> {
        self.queries.lock().unwrap().push(Query {
            model: model.to_string(),
            artifact_type: artifact_type.to_string(),
            criteria: criteria.clone(),
        });
        Ok(self
            .artifacts
            .iter()
            .filter(|a| a.model() == model && a.artifact_type().type_name() == artifact_type)
            .filter(|a| {
                criteria
                    .iter()
                    .all(|(key, value)| a.property(key).as_deref() == Some(value.as_str()))
            })
            .cloned()
            .collect())
    }
}

mock! {
    pub Context {}

    impl LinkerContext for Context {
        fn find_artifacts(
            &self,
            model: &str,
            artifact_type: &str,
            criteria: &Criteria,
        ) -> LinkResult<Vec<Artifact>>;
    }
}
