//! Built-in Dockerfile bodies for every image type.
//!
//! Each body is the layer an image adds on top of its parent. GPU variants
//! share the CPU body of the same tier; only `gpu` itself differs.

use crate::dockerfile::{DockerfileBuilder, Instruction};

const BASE_IMAGE: &str = "{{ base_image }}";
const APT_CLEANUP: &str = "apt-get clean && rm -rf /var/lib/apt/lists/* /tmp/* /var/tmp/*";
const AZUL_KEY: &str = "0xB1998361219BD9C9";
const CRAN_KEY: &str = "E298A3A825C0D65DFD57CBB651716619E084DAB9";
const CRAN_REPO: &str =
    "deb [arch=amd64,i386] https://cran.rstudio.com/bin/linux/ubuntu $(lsb_release -cs)-cran40/";
const ZULU_PACKAGE_SUFFIXES: [&str; 12] = [
    "", "-jre", "-jre-headless", "-jdk", "-jdk-headless", "-doc", "-ca", "-ca-jre",
    "-ca-jre-headless", "-ca-jdk", "-ca-jdk-headless", "-ca-doc",
];

/// Image-type name and template source for every built-in type.
pub fn sources() -> Vec<(&'static str, String)> {
    vec![
        ("gpu", gpu()),
        ("minimal", minimal()),
        ("minimal-gpu", minimal()),
        ("standard", standard()),
        ("standard-gpu", standard()),
        ("python", python()),
        ("python-gpu", python()),
    ]
}

fn labels() -> [Instruction; 3] {
    [
        Instruction::label("io.dbx-runtime.image-type", "{{ image_type | docker_label }}"),
        Instruction::label("io.dbx-runtime.image-tag", "{{ image_tag | docker_label }}"),
        Instruction::label("io.dbx-runtime.os-version", "{{ os_version | docker_label }}"),
    ]
}

/// Pinned install of every zulu package for one JDK major version.
fn zulu_install(major: u32, version_arg: &str) -> Instruction {
    let packages: Vec<String> = ZULU_PACKAGE_SUFFIXES
        .iter()
        .map(|suffix| format!("zulu{major}{suffix}=${version_arg}"))
        .collect();
    Instruction::run(format!("apt-get install -y {}", packages.join(" ")))
}

fn gpu() -> String {
    DockerfileBuilder::new(BASE_IMAGE)
        .extend(labels())
        .extend([
            Instruction::comment("Disable NVIDIA repos to prevent accidental upgrades"),
            Instruction::run(
                "cd /etc/apt/sources.list.d && mv cuda-ubuntu{{ os_compact }}-x86_64.list cuda-ubuntu{{ os_compact }}-x86_64.list.disabled",
            ),
            Instruction::comment(
                "Install R since command `R` is required for setting up driver on cluster creation",
            ),
            Instruction::env("DEBIAN_FRONTEND", "noninteractive"),
            Instruction::run_steps([
                "apt-get update".to_string(),
                "apt-get install --yes gnupg lsb-release software-properties-common apt-transport-https".to_string(),
                format!("gpg --keyserver hkp://keyserver.ubuntu.com:80 --recv-keys {CRAN_KEY}"),
                format!("gpg -a --export {CRAN_KEY} | apt-key add -"),
                format!("add-apt-repository -y \"{CRAN_REPO}\""),
                "apt-get update".to_string(),
                "apt-get install --yes libssl-dev r-base r-base-dev".to_string(),
                format!("add-apt-repository -r \"{CRAN_REPO}\""),
                format!("apt-key del {CRAN_KEY}"),
                APT_CLEANUP.to_string(),
            ]),
        ])
        .build()
}

fn minimal() -> String {
    DockerfileBuilder::new(BASE_IMAGE)
        .extend(labels())
        .extend([
            Instruction::env("LANG", "C.UTF-8"),
            Instruction::env("LC_ALL", "C.UTF-8"),
            Instruction::comment(
                "Workaround for https://bugs.launchpad.net/ubuntu/+source/ca-certificates/+bug/2066990",
            ),
            Instruction::env("OPENSSL_FORCE_FIPS_MODE", "0"),
            Instruction::run_steps([
                "apt-get update",
                "apt-get -y upgrade",
                "apt-get install --yes {{ system_packages | join(sep=\" \") }}",
                APT_CLEANUP,
            ]),
            Instruction::comment("Import Azul's public key"),
            Instruction::run(format!(
                "apt-key adv --keyserver hkp://keyserver.ubuntu.com:80 --recv-keys {AZUL_KEY}"
            )),
            Instruction::comment("Add the Azul package to the APT repository"),
            Instruction::run_steps([
                "curl -O https://cdn.azul.com/zulu/bin/zulu-repo_1.0.0-3_all.deb",
                "apt-get install ./zulu-repo_1.0.0-3_all.deb",
                "rm zulu-repo_1.0.0-3_all.deb",
            ]),
            Instruction::arg("JDK8_VERSION", "\"{{ jdk8_version }}\""),
            Instruction::arg("JDK17_VERSION", "\"{{ jdk17_version }}\""),
            Instruction::run("apt-get update"),
            zulu_install(8, "JDK8_VERSION"),
            zulu_install(17, "JDK17_VERSION"),
            Instruction::run("update-java-alternatives -s zulu17-ca-amd64"),
            Instruction::comment(
                "Ubuntu's Java cert store lands in /etc/ssl/certs/java/cacerts; zulu ships its own and does not use it by default",
            ),
            Instruction::run("apt-get install --yes ca-certificates-java"),
            Instruction::comment("Add new user for cluster library installation"),
            Instruction::run("useradd libraries && usermod -L libraries"),
        ])
        .build()
}

fn standard() -> String {
    DockerfileBuilder::new(BASE_IMAGE)
        .extend(labels())
        .extend([
            Instruction::comment("DBFS FUSE mount and openssh-server for remote access"),
            Instruction::run_steps([
                "apt-get update",
                "apt-get install -y {{ standard_packages | join(sep=\" \") }}",
                APT_CLEANUP,
            ]),
            Instruction::env("USER", "root"),
            Instruction::comment(
                "The ssh daemon is not started automatically; run `sudo service ssh start`",
            ),
        ])
        .build()
}

fn python() -> String {
    DockerfileBuilder::new(BASE_IMAGE)
        .extend(labels())
        .extend([
            Instruction::label("io.dbx-runtime.runtime-version", "{{ runtime_version | docker_label }}"),
            Instruction::label("io.dbx-runtime.ml", "{{ is_ml | docker_label }}"),
            Instruction::arg("PYTHON_VERSION", "\"{{ python_version }}\""),
            Instruction::arg("PIP_VERSION", "\"{{ pip_version }}\""),
            Instruction::arg("SETUPTOOLS_VERSION", "\"{{ setuptools_version }}\""),
            Instruction::arg("WHEEL_VERSION", "\"{{ wheel_version }}\""),
            Instruction::arg("VIRTUALENV_VERSION", "\"{{ virtualenv_version }}\""),
            Instruction::comment("Installs python and virtualenv for Spark and Notebooks"),
            Instruction::run_steps([
                "apt-get update",
                "apt-get install -y curl software-properties-common",
                "add-apt-repository -y ppa:deadsnakes/ppa",
                "apt-get update",
                "apt-get install -y python${PYTHON_VERSION} python${PYTHON_VERSION}-dev",
                "curl https://bootstrap.pypa.io/get-pip.py -o get-pip.py",
                "/usr/bin/python${PYTHON_VERSION} get-pip.py --break-system-packages pip==${PIP_VERSION} setuptools==${SETUPTOOLS_VERSION} wheel==${WHEEL_VERSION}",
                "rm get-pip.py",
            ]),
            Instruction::run_steps([
                "/usr/local/bin/pip${PYTHON_VERSION} install --break-system-packages --no-cache-dir virtualenv==${VIRTUALENV_VERSION}",
                "sed -i -r 's/^(PERIODIC_UPDATE_ON_BY_DEFAULT) = True$/\\1 = False/' /usr/local/lib/python${PYTHON_VERSION}/dist-packages/virtualenv/seed/embed/base_embed.py",
                "/usr/local/bin/pip${PYTHON_VERSION} download pip==${PIP_VERSION} --dest /usr/local/lib/python${PYTHON_VERSION}/dist-packages/virtualenv_support/",
            ]),
            Instruction::comment("Initialize the default environment that Spark and notebooks will use"),
            Instruction::run(
                "virtualenv --python=python${PYTHON_VERSION} --system-site-packages /databricks/python3 --no-download --no-setuptools",
            ),
            Instruction::run("apt-get install -y {{ python_build_packages | join(sep=\" \") }}"),
            Instruction::comment("Libraries pinned to the runtime {{ runtime_version }} system environment"),
            Instruction::copy("{{ requirements_path }}", "/databricks/requirements.txt"),
            Instruction::run("/databricks/python3/bin/pip install --no-deps -r /databricks/requirements.txt"),
            Instruction::comment("Specifies where Spark will look for the python process"),
            Instruction::env("PYSPARK_PYTHON", "/databricks/python3/bin/python3"),
            Instruction::comment("Separate environment for the notebook language server"),
            Instruction::run_steps([
                "virtualenv --python=python${PYTHON_VERSION} --system-site-packages /databricks/python-lsp --no-download --no-setuptools",
                "/databricks/python-lsp/bin/pip install --no-cache-dir {{ lsp_packages | join(sep=\" \") }}",
            ]),
        ])
        .build()
}
